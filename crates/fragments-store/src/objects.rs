// ABOUTME: Object storage configuration and construction for fragment payloads.
// ABOUTME: Supports S3 (and S3-compatible endpoints), a local directory, or an in-process store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{BackoffConfig, RetryConfig};

/// Connection settings for an S3 bucket.
///
/// Credentials are not stored here; they are picked up from the standard
/// `AWS_*` environment variables by the S3 client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for MinIO and other S3-compatible services.
    pub endpoint: Option<String>,
    /// Allow plain HTTP. Only sensible with a local `endpoint`.
    pub allow_http: bool,
}

impl S3Config {
    pub fn aws(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            allow_http: false,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.allow_http = endpoint.starts_with("http://");
        self.endpoint = Some(endpoint);
        self
    }
}

/// Where fragment payload objects live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreConfig {
    /// Process-local object store, mostly for tests.
    Memory,
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    S3(S3Config),
}

impl ObjectStoreConfig {
    /// Build the object store. Transient S3 failures are retried by the
    /// client itself, bounded by `timeout`.
    pub fn build(&self, timeout: Duration) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
        match self {
            ObjectStoreConfig::Memory => Ok(Arc::new(InMemory::new())),
            ObjectStoreConfig::Local { root } => {
                std::fs::create_dir_all(root).map_err(|e| object_store::Error::Generic {
                    store: "LocalFileSystem",
                    source: Box::new(e),
                })?;
                Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
            }
            ObjectStoreConfig::S3(s3) => {
                let retry = RetryConfig {
                    backoff: BackoffConfig::default(),
                    max_retries: 3,
                    retry_timeout: timeout,
                };
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(&s3.bucket)
                    .with_region(&s3.region)
                    .with_allow_http(s3.allow_http)
                    .with_retry(retry);
                if let Some(endpoint) = &s3.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_virtual_hosted_style_request(false);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ObjectStoreConfig::Memory => "memory",
            ObjectStoreConfig::Local { .. } => "local",
            ObjectStoreConfig::S3(_) => "s3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn s3_endpoint_enables_http_only_for_http_urls() {
        let minio = S3Config::aws("bucket", "us-east-1").with_endpoint("http://localhost:9000");
        assert!(minio.allow_http);
        assert_eq!(minio.endpoint.as_deref(), Some("http://localhost:9000"));

        let tls = S3Config::aws("bucket", "us-east-1").with_endpoint("https://s3.example.com");
        assert!(!tls.allow_http);
    }

    #[test]
    fn local_store_creates_its_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("objects");
        let config = ObjectStoreConfig::Local { root: root.clone() };
        config.build(Duration::from_secs(1)).unwrap();
        assert!(root.is_dir());
        assert_eq!(config.kind(), "local");
    }
}
