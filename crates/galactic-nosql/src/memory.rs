//! In-process document store

use crate::document::{Document, ID_FIELD};
use crate::error::{NoSqlError, Result};
use crate::store::{document_matches, DocumentStore};
use async_trait::async_trait;
use galactic_identity::SearchFilter;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

type Collection = BTreeMap<String, Document>;

/// A [`DocumentStore`] backed by process memory, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn find(&self, collection: &str, filter: Option<&SearchFilter>) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| filter.map(|f| document_matches(f, doc)).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<String> {
        let id = match document.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                document.set_id(id.clone());
                id
            }
        };
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        if entries.contains_key(&id) {
            return Err(NoSqlError::Duplicate(id));
        }
        entries.insert(id.clone(), document);
        Ok(id)
    }

    async fn replace(&self, collection: &str, id: &str, mut document: Document) -> Result<bool> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection).and_then(|c| c.get_mut(id)) {
            Some(existing) => {
                if !document.contains(ID_FIELD) {
                    document.set_id(id);
                }
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some())
    }
}
