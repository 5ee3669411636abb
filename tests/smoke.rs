// ABOUTME: End-to-end smoke test for the fragment lifecycle through the HTTP router.
// ABOUTME: Walks create, read, convert, reject, update, and delete against both storage backends.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use fragments_core::{Converter, SharedBackend};
use fragments_server::{AppState, create_router};
use fragments_store::{BackendConfig, DurableConfig, ObjectStoreConfig, open_backend};
use http::Request;
use tower::ServiceExt;

const OWNER: &str = "user1@email.com";

struct Reply {
    status: u16,
    content_type: Option<String>,
    location: Option<String>,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn call(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Reply {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-owner-id", OWNER);
    if let Some(ct) = content_type {
        req = req.header("content-type", ct);
    }
    let resp = create_router(Arc::clone(state))
        .oneshot(req.body(Body::from(body.to_vec())).unwrap())
        .await
        .unwrap();

    let header = |name: &str| {
        resp.headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    };
    let status = resp.status().as_u16();
    let content_type = header("content-type");
    let location = header("location");
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();

    Reply {
        status,
        content_type,
        location,
        body,
    }
}

async fn run_lifecycle(backend: SharedBackend) {
    let state = Arc::new(AppState::new(backend, Converter::new(2), "http://localhost:8080"));

    // 1. Create a plain text fragment.
    let text = b"This is a fragment\n";
    let created = call(&state, "POST", "/v1/fragments", Some("text/plain"), text).await;
    assert_eq!(created.status, 201, "create should return 201");
    let json = created.json();
    let fragment = &json["fragment"];
    assert_eq!(fragment["size"], 19);
    assert_eq!(fragment["type"], "text/plain");
    assert_eq!(fragment["ownerId"], OWNER);
    let text_id = fragment["id"].as_str().unwrap().to_string();
    assert!(text_id.parse::<ulid::Ulid>().is_ok(), "id should be a ULID: {text_id}");
    assert_eq!(
        created.location.as_deref(),
        Some(format!("http://localhost:8080/v1/fragments/{text_id}").as_str())
    );

    // 2. Fetch its data.
    let data = call(&state, "GET", &format!("/v1/fragments/{text_id}"), None, b"").await;
    assert_eq!(data.status, 200);
    assert_eq!(data.content_type.as_deref(), Some("text/plain"));
    assert_eq!(data.body, "This is a fragment\n");

    // 3. Markdown fetched as HTML.
    let created = call(&state, "POST", "/v1/fragments", Some("text/markdown"), b"# Markdown").await;
    assert_eq!(created.status, 201);
    let md_id = created.json()["fragment"]["id"].as_str().unwrap().to_string();

    let html = call(&state, "GET", &format!("/v1/fragments/{md_id}.html"), None, b"").await;
    assert_eq!(html.status, 200);
    assert_eq!(html.content_type.as_deref(), Some("text/html"));
    assert_eq!(html.body, "<h1>Markdown</h1>\n");

    // 4. Markdown cannot become a GIF.
    let gif = call(&state, "GET", &format!("/v1/fragments/{md_id}.gif"), None, b"").await;
    assert_eq!(gif.status, 415);
    assert_eq!(gif.json()["status"], "error");

    // 5. Deleting an unknown id reports not found and changes nothing.
    let unknown = "/v1/fragments/01J00000000000000000000000";
    let missing = call(&state, "DELETE", unknown, None, b"").await;
    assert_eq!(missing.status, 404);
    let listing = call(&state, "GET", "/v1/fragments", None, b"").await;
    assert_eq!(listing.json()["fragments"], serde_json::json!([text_id, md_id]));

    // 6. Changing the type on update is rejected and the original is untouched.
    let update = call(
        &state,
        "PUT",
        &format!("/v1/fragments/{text_id}"),
        Some("text/markdown"),
        b"# Not plain",
    )
    .await;
    assert_eq!(update.status, 400);
    let info = call(&state, "GET", &format!("/v1/fragments/{text_id}/info"), None, b"").await;
    assert_eq!(info.json()["fragment"]["size"], 19);
    assert_eq!(info.json()["fragment"]["type"], "text/plain");

    // Same-type update succeeds and advances size and updated.
    let before = info.json()["fragment"]["updated"].as_str().unwrap().to_string();
    let uri = format!("/v1/fragments/{text_id}");
    let update = call(&state, "PUT", &uri, Some("text/plain"), b"short").await;
    assert_eq!(update.status, 200);
    let after = update.json();
    assert_eq!(after["fragment"]["size"], 5);
    let updated = after["fragment"]["updated"].as_str().unwrap().to_string();
    assert!(
        timestamp(&before) <= timestamp(&updated),
        "updated moved backwards: {before} -> {updated}"
    );

    // Delete, then everything about it is gone.
    let deleted = call(&state, "DELETE", &format!("/v1/fragments/{text_id}"), None, b"").await;
    assert_eq!(deleted.status, 200);
    let gone = call(&state, "GET", &format!("/v1/fragments/{text_id}"), None, b"").await;
    assert_eq!(gone.status, 404);

    let expanded = call(&state, "GET", "/v1/fragments?expand=1", None, b"").await;
    let records = expanded.json()["fragments"].as_array().unwrap().clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], md_id.as_str());
}

fn timestamp(ts: &str) -> chrono::DateTime<chrono::FixedOffset> {
    chrono::DateTime::parse_from_rfc3339(ts).unwrap()
}

#[tokio::test]
async fn smoke_memory_backend() {
    run_lifecycle(open_backend(&BackendConfig::Memory).unwrap()).await;
}

#[tokio::test]
async fn smoke_durable_backend() {
    let dir = tempfile::TempDir::new().unwrap();
    let backend = open_backend(&BackendConfig::Durable(DurableConfig {
        metadata_path: dir.path().join("fragments.db"),
        objects: ObjectStoreConfig::Local {
            root: dir.path().join("objects"),
        },
        prefix: "fragments".to_string(),
        timeout: Duration::from_secs(5),
    }))
    .unwrap();

    run_lifecycle(backend).await;
}
