//! File-backed document store.
//!
//! Each document is one YAML file:
//!
//! ```text
//! <root>/<collection>/<s1>/<s2>/<id>.yaml
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the id. Sharding keeps directory
//! sizes bounded as a unit's history grows.

use super::{
    check_collection, check_id, merge_fields, with_id, Document, DocumentStore, Query, StoreError,
    StoreResult, Subscribers, Subscription,
};
use crate::constants::DOCUMENT_EXTENSION;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use ward_uuid::RecordId;

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    subscribers: Subscribers,
}

impl FileStore {
    /// Opens a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
            subscribers: Subscribers::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, collection: &str, id: &RecordId) -> PathBuf {
        id.sharded_file(&self.root.join(collection), DOCUMENT_EXTENSION)
    }

    fn read_document(path: &Path) -> StoreResult<Document> {
        let contents = fs::read_to_string(path).map_err(StoreError::Read)?;
        serde_yaml::from_str(&contents).map_err(StoreError::Decode)
    }

    /// Writes through a temporary file in the same directory, then renames it over `path`,
    /// so readers see either the old document or the new one.
    fn write_document(path: &Path, document: &Document) -> StoreResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(StoreError::Write)?;
        let yaml = serde_yaml::to_string(document).map_err(StoreError::Encode)?;

        let mut temp = NamedTempFile::new_in(parent).map_err(StoreError::Write)?;
        temp.write_all(yaml.as_bytes()).map_err(StoreError::Write)?;
        temp.as_file().sync_all().map_err(StoreError::Write)?;
        temp.persist(path).map_err(|e| StoreError::Write(e.error))?;
        Ok(())
    }

    /// Reads every document in `collection`, ordered by id.
    ///
    /// Files that cannot be parsed are logged and skipped.
    fn load_collection(&self, collection: &str) -> Vec<Document> {
        let mut documents = BTreeMap::new();

        let collection_dir = self.root.join(collection);
        let s1_iter = match fs::read_dir(&collection_dir) {
            Ok(it) => it,
            Err(_) => return Vec::new(),
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let file_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for file in file_iter.flatten() {
                    let path = file.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                        continue;
                    }
                    let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    if !RecordId::is_canonical(id) {
                        continue;
                    }

                    match Self::read_document(&path) {
                        Ok(document) => {
                            documents.insert(id.to_string(), with_id(document, id));
                        }
                        Err(e) => {
                            tracing::warn!(
                                "failed to read document: {} - {}",
                                path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        documents.into_values().collect()
    }

    fn publish(&self, collection: &str) {
        if !self.subscribers.watches(collection) {
            return;
        }
        self.subscribers
            .publish(collection, &self.load_collection(collection));
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn create(&self, collection: &str, document: Document) -> StoreResult<String> {
        check_collection(collection)?;
        let _guard = self.write_lock.lock().await;
        let id = RecordId::new();
        let id_str = id.to_string();
        let path = self.document_path(collection, &id);
        Self::write_document(&path, &with_id(document, &id_str))?;
        tracing::debug!("created {}/{}", collection, id_str);
        self.publish(collection);
        Ok(id_str)
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> StoreResult<()> {
        check_collection(collection)?;
        let record_id = check_id(id)?;
        let _guard = self.write_lock.lock().await;
        let path = self.document_path(collection, &record_id);
        Self::write_document(&path, &with_id(document, id))?;
        tracing::debug!("wrote {}/{}", collection, id);
        self.publish(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        check_collection(collection)?;
        let record_id = check_id(id)?;
        let _guard = self.write_lock.lock().await;
        let path = self.document_path(collection, &record_id);
        if !path.is_file() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let mut document = Self::read_document(&path)?;
        merge_fields(&mut document, fields);
        Self::write_document(&path, &with_id(document, id))?;
        tracing::debug!("updated {}/{}", collection, id);
        self.publish(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        check_collection(collection)?;
        let record_id = check_id(id)?;
        let _guard = self.write_lock.lock().await;
        let path = self.document_path(collection, &record_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("deleted {}/{}", collection, id);
                self.publish(collection);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete(e)),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        check_collection(collection)?;
        let Ok(record_id) = RecordId::parse(id) else {
            return Ok(None);
        };
        let path = self.document_path(collection, &record_id);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(with_id(Self::read_document(&path)?, id)))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        check_collection(query.collection_name())?;
        Ok(query.select(&self.load_collection(query.collection_name())))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        check_collection(query.collection_name())?;
        let _guard = self.write_lock.lock().await;
        let current = self.load_collection(query.collection_name());
        Ok(self.subscribers.register(query, &current))
    }
}
