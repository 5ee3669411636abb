// ABOUTME: Fragment API handlers: create, list, read (raw or converted), info, update, and delete.
// ABOUTME: Each handler parses the request, calls the core with the resolved owner, and renders the envelope.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use fragments_core::{Fragment, FragmentError, NewFragment};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::owner::OwnerId;
use crate::response;

/// Query parameters for the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub expand: Option<String>,
}

impl ListQuery {
    fn expand(&self) -> bool {
        matches!(self.expand.as_deref(), Some("1" | "true"))
    }
}

fn content_type(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingContentType)
}

/// Split `abc.html` into the id and requested extension.
fn split_extension(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once('.') {
        Some((id, ext)) if !id.is_empty() => (id, Some(ext)),
        _ => (raw, None),
    }
}

/// Fragment metadata plus the types it can be served as.
fn fragment_json(fragment: &Fragment) -> Value {
    let mut value = json!(fragment.record());
    if let Value::Object(fields) = &mut value {
        fields.insert("formats".to_string(), json!(fragment.formats()));
    }
    value
}

/// GET /v1/fragments - List the owner's fragment ids, or full records with `?expand=1`.
pub async fn list_fragments(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let listing = Fragment::by_user(&state.backend, &owner, query.expand()).await?;
    Ok(Json(response::success(json!({ "fragments": listing }))))
}

/// POST /v1/fragments - Create a fragment from the raw body and its Content-Type.
pub async fn create_fragment(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let declared = content_type(&headers)?;
    let mut fragment = Fragment::new(state.backend.clone(), NewFragment::new(owner, declared))?;
    fragment.set_data(body).await?;
    fragment.save().await?;

    tracing::info!(
        owner_id = fragment.owner_id(),
        id = fragment.id(),
        media_type = %fragment.media_type(),
        size = fragment.size(),
        "created fragment"
    );

    let location = state.fragment_url(fragment.id());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response::success(json!({ "fragment": fragment_json(&fragment) }))),
    )
        .into_response())
}

/// GET /v1/fragments/{id} - The stored bytes, or `{id}.{ext}` for a converted representation.
pub async fn get_fragment(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let (id, extension) = split_extension(&raw_id);
    let fragment = Fragment::by_id(&state.backend, &owner, id).await?;

    let Some(extension) = extension else {
        let data = fragment.get_data().await?;
        let content_type = fragment.media_type().as_str().to_string();
        return Ok(([(header::CONTENT_TYPE, content_type)], data).into_response());
    };

    // Reject before touching the payload.
    state.converter.resolve(fragment.media_type(), extension)?;
    let data = fragment.get_data().await?;
    let converted = state
        .converter
        .convert(fragment.media_type(), data, extension)
        .await?;

    Ok(([(header::CONTENT_TYPE, converted.content_type())], converted.data).into_response())
}

/// GET /v1/fragments/{id}/info - Metadata only.
pub async fn get_fragment_info(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let fragment = Fragment::by_id(&state.backend, &owner, &id).await?;
    Ok(Json(response::success(json!({ "fragment": fragment_json(&fragment) }))))
}

/// PUT /v1/fragments/{id} - Replace the payload; the Content-Type must match the stored type.
pub async fn update_fragment(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let declared = content_type(&headers)?;
    let mut fragment = Fragment::by_id(&state.backend, &owner, &id).await?;

    if let Err(e) = fragment.update(declared, body).await {
        if let FragmentError::TypeImmutable { .. } = &e {
            tracing::warn!(owner_id = %owner, id = %id, error = %e, "rejected fragment update");
        }
        return Err(e.into());
    }

    tracing::info!(owner_id = %owner, id = %id, size = fragment.size(), "updated fragment");
    Ok(Json(response::success(json!({ "fragment": fragment_json(&fragment) }))))
}

/// DELETE /v1/fragments/{id} - Remove metadata and payload.
pub async fn delete_fragment(
    State(state): State<SharedState>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Fragment::delete(&state.backend, &owner, &id).await?;
    tracing::info!(owner_id = %owner, id = %id, "deleted fragment");
    Ok(Json(response::success(Value::Null)))
}
