// ABOUTME: Shared application state for the fragments HTTP server.
// ABOUTME: Holds the one storage backend, the converter, and the public base URL for Location headers.

use std::sync::Arc;

use fragments_core::{Converter, MemoryBackend, SharedBackend};

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub backend: SharedBackend,
    pub converter: Converter,
    /// Base URL used to build `Location` headers, without a trailing slash.
    pub api_url: String,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(backend: SharedBackend, converter: Converter, api_url: impl Into<String>) -> Self {
        Self {
            backend,
            converter,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(api_url: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Converter::default(), api_url)
    }

    pub fn fragment_url(&self, id: &str) -> String {
        format!("{}/v1/fragments/{}", self.api_url, id)
    }
}
