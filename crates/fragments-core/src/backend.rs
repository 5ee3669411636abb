// ABOUTME: The storage backend contract every persistence strategy implements.
// ABOUTME: Metadata and payload are two independent records under the same (owner_id, id) key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::record::{FragmentListing, FragmentRecord};

/// Failures raised by a storage backend.
///
/// Backends translate provider errors into these variants at their boundary;
/// no provider error type is ever carried inside.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("{backend} backend failed to {operation}: {message}")]
    Backend {
        backend: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("{backend} backend timed out during {operation} after {after:?}")]
    Timeout {
        backend: &'static str,
        operation: &'static str,
        after: Duration,
    },

    #[error("{backend} backend returned a corrupt record: {message}")]
    Corrupt {
        backend: &'static str,
        message: String,
    },
}

/// Persistence operations for fragment metadata and payloads.
///
/// Absence is never an error: reads return `None`, deletes of missing keys
/// succeed, and listing an owner with nothing stored yields an empty listing.
/// Implementations must be safe to share across tasks; one instance is built
/// at startup and handed to everything that needs it.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upsert the metadata record keyed by `(record.owner_id, record.id)`.
    async fn put_metadata(&self, record: &FragmentRecord) -> Result<(), StorageError>;

    async fn get_metadata(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<FragmentRecord>, StorageError>;

    /// List an owner's fragments in insertion order, as ids or full records.
    async fn list_metadata(
        &self,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing, StorageError>;

    async fn delete_metadata(&self, owner_id: &str, id: &str) -> Result<(), StorageError>;

    /// The owner holding metadata under `id`, searched across all owners.
    async fn find_owner(&self, id: &str) -> Result<Option<String>, StorageError>;

    /// Store a payload, replacing any previous one in full.
    async fn put_data(&self, owner_id: &str, id: &str, data: Bytes) -> Result<(), StorageError>;

    async fn get_data(&self, owner_id: &str, id: &str) -> Result<Option<Bytes>, StorageError>;

    async fn delete_data(&self, owner_id: &str, id: &str) -> Result<(), StorageError>;

    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;
}

/// The process-wide backend handle.
pub type SharedBackend = Arc<dyn StorageBackend>;
