// ABOUTME: Route definitions for the fragments HTTP API and the health check.
// ABOUTME: Assembles all routes into a single Axum Router with owner resolution and request tracing.

use axum::Json;
use axum::Router;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;
use crate::owner::OwnerLayer;
use crate::response;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        .route(
            "/v1/fragments",
            get(api::fragments::list_fragments).post(api::fragments::create_fragment),
        )
        .route(
            "/v1/fragments/{id}",
            get(api::fragments::get_fragment)
                .put(api::fragments::update_fragment)
                .delete(api::fragments::delete_fragment),
        )
        .route("/v1/fragments/{id}/info", get(api::fragments::get_fragment_info))
        .layer(OwnerLayer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Never cached so monitors always reach the process.
async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Json(response::success(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }))),
    )
}
