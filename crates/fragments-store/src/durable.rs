// ABOUTME: Durable storage backend: payloads in an object store, metadata documents in SQLite.
// ABOUTME: Provider errors are logged and translated to StorageError here; no cross-store transaction exists.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fragments_core::{FragmentListing, FragmentRecord, StorageBackend, StorageError};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use tracing::{debug, instrument};

use crate::config::DurableConfig;
use crate::metadata::{MetadataError, SqliteMetadata};

const BACKEND: &str = "durable";

/// Backend that keeps metadata and payloads in two independent durable stores.
///
/// A crash between the metadata write and the payload write can leave one
/// without the other. Readers see that as a missing payload, never as empty
/// content.
pub struct DurableBackend {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<SqliteMetadata>,
    prefix: ObjectPath,
    timeout: Duration,
}

impl DurableBackend {
    /// Open both stores from configuration.
    pub fn open(config: &DurableConfig) -> Result<Self, StorageError> {
        let objects = config.objects.build(config.timeout).map_err(|e| {
            tracing::error!(
                error = %e,
                store = config.objects.kind(),
                "failed to build object store"
            );
            backend_error("open object store", e)
        })?;
        Self::with_object_store(objects, &config.metadata_path, &config.prefix, config.timeout)
    }

    /// Use an existing object store with a metadata database at `metadata_path`.
    pub fn with_object_store(
        objects: Arc<dyn ObjectStore>,
        metadata_path: &Path,
        prefix: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = metadata_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| backend_error("open metadata", e))?;
        }
        let metadata =
            SqliteMetadata::open(metadata_path).map_err(|e| metadata_error("open metadata", e))?;
        Ok(Self::from_parts(objects, metadata, prefix, timeout))
    }

    /// Both stores held in process memory; contents vanish on drop.
    pub fn in_memory(timeout: Duration) -> Result<Self, StorageError> {
        let metadata =
            SqliteMetadata::open_in_memory().map_err(|e| metadata_error("open metadata", e))?;
        Ok(Self::from_parts(
            Arc::new(object_store::memory::InMemory::new()),
            metadata,
            "fragments",
            timeout,
        ))
    }

    fn from_parts(
        objects: Arc<dyn ObjectStore>,
        metadata: SqliteMetadata,
        prefix: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            objects,
            metadata: Arc::new(metadata),
            prefix: ObjectPath::from(prefix),
            timeout,
        }
    }

    /// Object key for a payload: `<prefix>/<owner_id>/<id>`. Each segment is
    /// percent-encoded, so ids containing `/` stay inside their owner.
    fn object_path(&self, owner_id: &str, id: &str) -> ObjectPath {
        self.prefix.child(owner_id).child(id)
    }

    async fn with_timeout<F: Future>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<F::Output, StorageError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                tracing::error!(
                    operation,
                    after = ?self.timeout,
                    "durable backend call timed out"
                );
                StorageError::Timeout {
                    backend: BACKEND,
                    operation,
                    after: self.timeout,
                }
            })
    }

    /// Run a metadata call on the blocking pool, bounded by the timeout.
    async fn metadata_call<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteMetadata) -> Result<T, MetadataError> + Send + 'static,
    {
        let metadata = Arc::clone(&self.metadata);
        let task = tokio::task::spawn_blocking(move || call(&metadata));
        match self.with_timeout(operation, task).await? {
            Ok(result) => result.map_err(|e| metadata_error(operation, e)),
            Err(e) => Err(backend_error(operation, e)),
        }
    }
}

impl std::fmt::Debug for DurableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableBackend")
            .field("objects", &self.objects.to_string())
            .field("prefix", &self.prefix.as_ref())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn backend_error(operation: &'static str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        backend: BACKEND,
        operation,
        message: err.to_string(),
    }
}

fn metadata_error(operation: &'static str, err: MetadataError) -> StorageError {
    tracing::error!(operation, error = %err, "metadata store call failed");
    match err {
        MetadataError::Json(e) => StorageError::Corrupt {
            backend: BACKEND,
            message: e.to_string(),
        },
        MetadataError::Sqlite(e) => backend_error(operation, e),
    }
}

fn object_error(
    operation: &'static str,
    path: &ObjectPath,
    err: object_store::Error,
) -> StorageError {
    tracing::error!(operation, key = %path, error = %err, "object store call failed");
    backend_error(operation, err)
}

#[async_trait]
impl StorageBackend for DurableBackend {
    #[instrument(skip(self, record), fields(owner_id = %record.owner_id, id = %record.id))]
    async fn put_metadata(&self, record: &FragmentRecord) -> Result<(), StorageError> {
        debug!("writing fragment metadata");
        let record = record.clone();
        self.metadata_call("put metadata", move |meta| meta.upsert(&record))
            .await
    }

    #[instrument(skip(self))]
    async fn get_metadata(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<FragmentRecord>, StorageError> {
        debug!("reading fragment metadata");
        let (owner_id, id) = (owner_id.to_string(), id.to_string());
        self.metadata_call("get metadata", move |meta| meta.get(&owner_id, &id))
            .await
    }

    #[instrument(skip(self))]
    async fn list_metadata(
        &self,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing, StorageError> {
        debug!("listing fragments");
        let owner_id = owner_id.to_string();
        self.metadata_call("list metadata", move |meta| meta.list(&owner_id, expand))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_metadata(&self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        debug!("deleting fragment metadata");
        let (owner_id, id) = (owner_id.to_string(), id.to_string());
        self.metadata_call("delete metadata", move |meta| meta.delete(&owner_id, &id))
            .await
    }

    #[instrument(skip(self))]
    async fn find_owner(&self, id: &str) -> Result<Option<String>, StorageError> {
        debug!("looking up fragment owner");
        let id = id.to_string();
        self.metadata_call("find owner", move |meta| meta.find_owner(&id))
            .await
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put_data(&self, owner_id: &str, id: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.object_path(owner_id, id);
        debug!(key = %path, "writing fragment data");

        self.with_timeout("put data", self.objects.put(&path, data.into()))
            .await?
            .map(|_| ())
            .map_err(|e| object_error("put data", &path, e))
    }

    #[instrument(skip(self))]
    async fn get_data(&self, owner_id: &str, id: &str) -> Result<Option<Bytes>, StorageError> {
        let path = self.object_path(owner_id, id);
        debug!(key = %path, "reading fragment data");

        let fetched = self
            .with_timeout("get data", async {
                match self.objects.get(&path).await {
                    Ok(result) => result.bytes().await.map(Some),
                    Err(object_store::Error::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        fetched.map_err(|e| object_error("get data", &path, e))
    }

    #[instrument(skip(self))]
    async fn delete_data(&self, owner_id: &str, id: &str) -> Result<(), StorageError> {
        let path = self.object_path(owner_id, id);
        debug!(key = %path, "deleting fragment data");

        match self.with_timeout("delete data", self.objects.delete(&path)).await? {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(object_error("delete data", &path, e)),
        }
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}
