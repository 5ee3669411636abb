// ABOUTME: Durable persistence for fragments and the one-time backend selection made at startup.
// ABOUTME: Provides the object-store + SQLite backend, its configuration, and open_backend.

pub mod config;
pub mod durable;
mod metadata;
pub mod objects;

use std::sync::Arc;

use fragments_core::{MemoryBackend, SharedBackend, StorageError};

pub use config::{BackendConfig, ConfigError, DurableConfig};
pub use durable::DurableBackend;
pub use objects::{ObjectStoreConfig, S3Config};

/// Construct the single backend instance the process will share.
pub fn open_backend(config: &BackendConfig) -> Result<SharedBackend, StorageError> {
    let backend: SharedBackend = match config {
        BackendConfig::Memory => Arc::new(MemoryBackend::new()),
        BackendConfig::Durable(durable) => Arc::new(DurableBackend::open(durable)?),
    };

    match config {
        BackendConfig::Durable(durable) => tracing::info!(
            backend = backend.name(),
            objects = durable.objects.kind(),
            metadata = %durable.metadata_path.display(),
            "storage backend ready"
        ),
        BackendConfig::Memory => tracing::info!(
            backend = backend.name(),
            "storage backend ready; data will not survive restart"
        ),
    }
    Ok(backend)
}
