// ABOUTME: Maps core fragment errors onto HTTP status codes and the JSON error envelope.
// ABOUTME: Storage failures are logged in full and surfaced to clients only as a generic 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fragments_core::FragmentError;
use thiserror::Error;

use crate::response;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error("missing Content-Type header")]
    MissingContentType,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Fragment(err) => match err {
                FragmentError::Validation(_) | FragmentError::TypeImmutable { .. } => {
                    StatusCode::BAD_REQUEST
                }
                FragmentError::NotFound { .. } => StatusCode::NOT_FOUND,
                FragmentError::UnsupportedMediaType(_)
                | FragmentError::UnsupportedConversion { .. } => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                FragmentError::ConversionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FragmentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Fragment(FragmentError::Storage(source)) = &self {
            tracing::error!(error = %source, "storage failure while handling request");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = response::failure(status.as_u16(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragments_core::{Missing, StorageError};

    #[test]
    fn status_mapping() {
        let cases = [
            (FragmentError::Validation("x".into()), 400),
            (
                FragmentError::TypeImmutable {
                    stored: "text/plain".into(),
                    declared: "text/markdown".into(),
                },
                400,
            ),
            (FragmentError::not_found("id", Missing::Data), 404),
            (FragmentError::UnsupportedMediaType("audio/mpeg".into()), 415),
            (
                FragmentError::UnsupportedConversion {
                    from: "text/markdown".into(),
                    extension: "gif".into(),
                },
                415,
            ),
            (FragmentError::ConversionFailed("bad png".into()), 422),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), code);
        }
        assert_eq!(ApiError::MissingContentType.status().as_u16(), 415);
    }

    #[tokio::test]
    async fn storage_errors_hide_detail() {
        let err = ApiError::from(FragmentError::from(StorageError::Backend {
            backend: "durable",
            operation: "get data",
            message: "s3 bucket frags-prod unreachable".into(),
        }));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], 500);
        assert_eq!(json["error"]["message"], "internal storage error");
    }
}
