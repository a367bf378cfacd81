//! Document persistence.
//!
//! The lifecycle core talks to storage only through [`DocumentStore`]: flat JSON-style
//! documents grouped into named collections, addressed by store-assigned ids, with
//! equality queries and live subscriptions. Two backends are provided:
//!
//! - [`MemoryStore`] keeps everything in process, for tests and ephemeral runs.
//! - [`FileStore`] writes one YAML file per document under a sharded directory tree.
//!
//! Every document handed back by a store carries its id in the `id` field.
//!
//! # Subscriptions
//!
//! [`DocumentStore::subscribe`] yields a [`Subscription`] that receives the full matching
//! result set immediately and again after every write to the collection. Snapshots are
//! complete, never diffs, and arrive in the order the writes were applied.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::constants::ID_FIELD;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A stored document: a flat map of field names to JSON values.
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("document {id} not found in collection {collection}")]
    NotFound { collection: String, id: String },
    #[error("failed to read document: {0}")]
    Read(std::io::Error),
    #[error("failed to write document: {0}")]
    Write(std::io::Error),
    #[error("failed to delete document: {0}")]
    Delete(std::io::Error),
    #[error("failed to encode document: {0}")]
    Encode(serde_yaml::Error),
    #[error("failed to decode document: {0}")]
    Decode(serde_yaml::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Collection names become directory names, so only a conservative character set is allowed.
pub fn is_safe_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub(crate) fn check_collection(name: &str) -> StoreResult<()> {
    if is_safe_collection_name(name) {
        return Ok(());
    }
    Err(StoreError::InvalidInput(format!(
        "invalid collection name: '{name}'"
    )))
}

pub(crate) fn check_id(id: &str) -> StoreResult<ward_uuid::RecordId> {
    ward_uuid::RecordId::parse(id).map_err(|e| StoreError::InvalidInput(e.to_string()))
}

/// Stamps the document key into the document body.
pub(crate) fn with_id(mut document: Document, id: &str) -> Document {
    document.insert(ID_FIELD.into(), Value::String(id.into()));
    document
}

/// Shallow merge: top-level fields in `fields` replace those in `document`.
pub(crate) fn merge_fields(document: &mut Document, fields: Document) {
    for (key, value) in fields {
        if key == ID_FIELD {
            continue;
        }
        document.insert(key, value);
    }
}

/// An equality-filtered view of one collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<(String, Value)>,
}

impl Query {
    /// Every document in `collection`.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
        }
    }

    /// Adds the constraint `field == value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }

    pub(crate) fn select(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .filter(|document| self.matches(document))
            .cloned()
            .collect()
    }
}

/// A live result set. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    /// Waits for the next snapshot. Returns `None` once the store has gone away.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Returns a snapshot if one is already queued.
    pub fn try_next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.try_recv().ok()
    }
}

/// Subscriber registry shared by the store backends.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    entries: Mutex<Vec<(Query, mpsc::UnboundedSender<Vec<Document>>)>>,
}

impl Subscribers {
    /// Registers `query` and delivers `current` (the whole collection) as its first snapshot.
    pub(crate) fn register(&self, query: Query, current: &[Document]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(query.select(current));
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push((query, tx));
        Subscription { rx }
    }

    /// Sends a fresh snapshot to every subscriber of `collection`, dropping closed ones.
    pub(crate) fn publish(&self, collection: &str, documents: &[Document]) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(query, tx)| {
            if query.collection != collection {
                return !tx.is_closed();
            }
            tx.send(query.select(documents)).is_ok()
        });
    }

    /// Whether any open subscription watches `collection`. Closed ones are dropped.
    pub(crate) fn watches(&self, collection: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(_, tx)| !tx.is_closed());
        entries.iter().any(|(query, _)| query.collection == collection)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Persistence collaborator consumed by the lifecycle core.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Inserts a document under a fresh store-assigned id and returns the id.
    async fn create(&self, collection: &str, document: Document) -> StoreResult<String>;

    /// Writes a document under a caller-chosen id, replacing any existing document.
    async fn create_with_id(&self, collection: &str, id: &str, document: Document)
        -> StoreResult<()>;

    /// Merges `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no document has this id.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;

    /// Removes a document. Removing a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// One-shot read of every document matching `query`, ordered by id.
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Live read of every document matching `query`.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_safe_collection_names() {
        assert!(is_safe_collection_name("patients"));
        assert!(is_safe_collection_name("mortality_records"));
        assert!(is_safe_collection_name("hdu-2025"));
        assert!(!is_safe_collection_name(""));
        assert!(!is_safe_collection_name("../etc"));
        assert!(!is_safe_collection_name("a/b"));
    }

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::collection("patients")
            .where_eq("unit", "ICU")
            .where_eq("status", "Active");

        assert!(query.matches(&doc(json!({"unit": "ICU", "status": "Active", "name": "X"}))));
        assert!(!query.matches(&doc(json!({"unit": "ICU", "status": "Discharged"}))));
        assert!(!query.matches(&doc(json!({"status": "Active"}))));
        assert!(Query::collection("patients").matches(&doc(json!({}))));
    }

    #[test]
    fn test_merge_is_shallow_and_keeps_id() {
        let mut document = doc(json!({"id": "a", "name": "OLD", "lengthOfStay": 3}));
        merge_fields(
            &mut document,
            doc(json!({"id": "b", "name": "NEW", "status": "Discharged"})),
        );
        assert_eq!(
            Value::Object(document),
            json!({"id": "a", "name": "NEW", "lengthOfStay": 3, "status": "Discharged"})
        );
    }

    #[tokio::test]
    async fn test_subscribers_receive_initial_and_published_snapshots() {
        let subscribers = Subscribers::default();
        let current = vec![doc(json!({"unit": "ICU"})), doc(json!({"unit": "HDU"}))];
        let mut icu = subscribers.register(Query::collection("patients").where_eq("unit", "ICU"), &current);

        assert_eq!(icu.next_snapshot().await.unwrap().len(), 1);

        subscribers.publish("mortality_records", &current);
        assert!(icu.try_next_snapshot().is_none());

        subscribers.publish("patients", &[]);
        assert_eq!(icu.next_snapshot().await.unwrap(), Vec::<Document>::new());
    }

    #[test]
    fn test_watches_only_open_subscriptions() {
        let subscribers = Subscribers::default();
        assert!(!subscribers.watches("patients"));

        let subscription = subscribers.register(Query::collection("patients"), &[]);
        assert!(subscribers.watches("patients"));
        assert!(!subscribers.watches("mortality_records"));

        drop(subscription);
        assert!(!subscribers.watches("patients"));
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let subscribers = Subscribers::default();
        let subscription = subscribers.register(Query::collection("patients"), &[]);
        assert_eq!(subscribers.len(), 1);

        drop(subscription);
        subscribers.publish("patients", &[]);
        assert_eq!(subscribers.len(), 0);
    }
}
