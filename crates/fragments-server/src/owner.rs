// ABOUTME: Resolves the caller's owner id from the trusted X-Owner-Id header on /v1 routes.
// ABOUTME: Requests without one are rejected with 401; the health route is exempt.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};

use crate::response;

/// Header set by the upstream authenticator.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The authenticated owner for a request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

/// A tower Layer that requires an owner id on API routes.
#[derive(Debug, Clone, Default)]
pub struct OwnerLayer;

impl<S> Layer<S> for OwnerLayer {
    type Service = OwnerMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OwnerMiddleware { inner }
    }
}

/// The middleware service that attaches `OwnerId` to /v1/* requests.
#[derive(Debug, Clone)]
pub struct OwnerMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OwnerMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let path = req.uri().path();
        let mut inner = self.inner.clone();

        if !(path == "/v1" || path.starts_with("/v1/")) {
            return Box::pin(async move { inner.call(req).await });
        }

        let owner = req
            .headers()
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        match owner {
            Some(owner) => {
                req.extensions_mut().insert(OwnerId(owner));
                Box::pin(async move { inner.call(req).await })
            }
            None => Box::pin(async move {
                tracing::debug!("rejecting request without owner id");
                let body = response::failure(401, "unauthorized");
                Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response())
            }),
        }
    }
}
