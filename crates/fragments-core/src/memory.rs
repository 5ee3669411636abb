// ABOUTME: Ephemeral in-process storage backend that lives only as long as the process.
// ABOUTME: Each key is replaced whole under a write lock, so readers never see a torn value.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::backend::{StorageBackend, StorageError};
use crate::record::{FragmentListing, FragmentRecord};

/// Values for a single owner, with ids kept in first-insertion order.
#[derive(Debug)]
struct OwnerTable<V> {
    order: Vec<String>,
    values: HashMap<String, V>,
}

impl<V> Default for OwnerTable<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<V> OwnerTable<V> {
    fn put(&mut self, id: &str, value: V) {
        if self.values.insert(id.to_string(), value).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn remove(&mut self, id: &str) {
        if self.values.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    fn ordered(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|id| self.values.get(id))
    }
}

/// Keyed owner -> id -> value map guarded by a single lock.
#[derive(Debug)]
struct KeyedStore<V> {
    owners: RwLock<HashMap<String, OwnerTable<V>>>,
}

impl<V: Clone> KeyedStore<V> {
    fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
        }
    }

    fn put(&self, owner_id: &str, id: &str, value: V) {
        self.owners
            .write()
            .entry(owner_id.to_string())
            .or_default()
            .put(id, value);
    }

    fn get(&self, owner_id: &str, id: &str) -> Option<V> {
        self.owners
            .read()
            .get(owner_id)
            .and_then(|table| table.values.get(id))
            .cloned()
    }

    fn remove(&self, owner_id: &str, id: &str) {
        let mut owners = self.owners.write();
        if let Some(table) = owners.get_mut(owner_id) {
            table.remove(id);
            if table.values.is_empty() {
                owners.remove(owner_id);
            }
        }
    }

    fn ordered(&self, owner_id: &str) -> Vec<V> {
        self.owners
            .read()
            .get(owner_id)
            .map(|table| table.ordered().cloned().collect())
            .unwrap_or_default()
    }

    fn owner_of(&self, id: &str) -> Option<String> {
        self.owners
            .read()
            .iter()
            .find(|(_, table)| table.values.contains_key(id))
            .map(|(owner_id, _)| owner_id.clone())
    }
}

/// In-memory backend with separate metadata and payload stores.
#[derive(Debug)]
pub struct MemoryBackend {
    metadata: KeyedStore<FragmentRecord>,
    data: KeyedStore<Bytes>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            metadata: KeyedStore::new(),
            data: KeyedStore::new(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn put_metadata(&self, record: &FragmentRecord) -> Result<(), StorageError> {
        tracing::debug!(owner_id = %record.owner_id, id = %record.id, "writing fragment metadata");
        self.metadata
            .put(&record.owner_id, &record.id, record.clone());
        Ok(())
    }

    async fn get_metadata(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<FragmentRecord>, StorageError> {
        tracing::debug!(owner_id, id, "reading fragment metadata");
        Ok(self.metadata.get(owner_id, id))
    }

    async fn list_metadata(
        &self,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing, StorageError> {
        tracing::debug!(owner_id, expand, "listing fragments");
        Ok(FragmentListing::from_records(
            self.metadata.ordered(owner_id),
            expand,
        ))
    }

    async fn delete_metadata(&self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        tracing::debug!(owner_id, id, "deleting fragment metadata");
        self.metadata.remove(owner_id, id);
        Ok(())
    }

    async fn find_owner(&self, id: &str) -> Result<Option<String>, StorageError> {
        tracing::debug!(id, "looking up fragment owner");
        Ok(self.metadata.owner_of(id))
    }

    async fn put_data(&self, owner_id: &str, id: &str, data: Bytes) -> Result<(), StorageError> {
        tracing::debug!(owner_id, id, size = data.len(), "writing fragment data");
        self.data.put(owner_id, id, data);
        Ok(())
    }

    async fn get_data(&self, owner_id: &str, id: &str) -> Result<Option<Bytes>, StorageError> {
        tracing::debug!(owner_id, id, "reading fragment data");
        Ok(self.data.get(owner_id, id))
    }

    async fn delete_data(&self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        tracing::debug!(owner_id, id, "deleting fragment data");
        self.data.remove(owner_id, id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
