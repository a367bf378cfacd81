//! In-process document store.

use super::{
    check_collection, check_id, merge_fields, with_id, Document, DocumentStore, Query, StoreError,
    StoreResult, Subscribers, Subscription,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use ward_uuid::RecordId;

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Keeps every collection in memory. Nothing survives the process.
///
/// Writes and the snapshots they trigger happen under one lock, so subscribers see writes in
/// the order they were applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Collections>,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(data: &Collections, collection: &str) -> Vec<Document> {
        data.get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    fn publish(&self, data: &Collections, collection: &str) {
        self.subscribers
            .publish(collection, &Self::snapshot(data, collection));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, document: Document) -> StoreResult<String> {
        check_collection(collection)?;
        let id = RecordId::new().to_string();
        let mut data = self.data.lock().await;
        data.entry(collection.to_string())
            .or_default()
            .insert(id.clone(), with_id(document, &id));
        self.publish(&data, collection);
        Ok(id)
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        check_collection(collection)?;
        check_id(id)?;
        let mut data = self.data.lock().await;
        data.entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), with_id(document, id));
        self.publish(&data, collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        check_collection(collection)?;
        check_id(id)?;
        let mut data = self.data.lock().await;
        let document = data
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_fields(document, fields);
        self.publish(&data, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        check_collection(collection)?;
        check_id(id)?;
        let mut data = self.data.lock().await;
        let removed = data
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.publish(&data, collection);
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        check_collection(collection)?;
        let data = self.data.lock().await;
        Ok(data.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        check_collection(query.collection_name())?;
        let data = self.data.lock().await;
        Ok(query.select(&Self::snapshot(&data, query.collection_name())))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        check_collection(query.collection_name())?;
        let data = self.data.lock().await;
        let current = Self::snapshot(&data, query.collection_name());
        Ok(self.subscribers.register(query, &current))
    }
}
