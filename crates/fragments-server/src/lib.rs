// ABOUTME: HTTP server for fragments, rendering core results and errors as a JSON envelope.
// ABOUTME: Uses Axum with a shared backend handle and converter injected at startup.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod owner;
pub mod response;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::create_router;
