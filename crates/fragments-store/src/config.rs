// ABOUTME: Storage backend configuration loaded once at startup from environment variables.
// ABOUTME: Selects the ephemeral or durable backend and, for durable, where metadata and payloads live.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::objects::{ObjectStoreConfig, S3Config};

const DEFAULT_METADATA_PATH: &str = "./data/fragments.db";
const DEFAULT_DATA_DIR: &str = "./data/objects";
const DEFAULT_PREFIX: &str = "fragments";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Errors that can occur while loading backend configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FRAGMENTS_BACKEND must be 'memory' or 'durable', got '{0}'")]
    UnknownBackend(String),

    #[error("FRAGMENTS_OBJECT_STORE must be 'local', 's3', or 'memory', got '{0}'")]
    UnknownObjectStore(String),

    #[error("FRAGMENTS_S3_BUCKET is required when FRAGMENTS_OBJECT_STORE=s3")]
    MissingBucket,

    #[error("FRAGMENTS_STORAGE_TIMEOUT_MS must be a positive integer, got '{0}'")]
    InvalidTimeout(String),
}

/// Settings for the durable backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableConfig {
    pub metadata_path: PathBuf,
    pub objects: ObjectStoreConfig,
    pub prefix: String,
    /// Upper bound on every individual storage call.
    pub timeout: Duration,
}

/// Which storage backend the process runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    Durable(DurableConfig),
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - FRAGMENTS_BACKEND: `memory` or `durable` (default: memory)
    /// - FRAGMENTS_METADATA_PATH: SQLite metadata file (default: ./data/fragments.db)
    /// - FRAGMENTS_OBJECT_STORE: `local`, `s3`, or `memory` (default: local)
    /// - FRAGMENTS_DATA_DIR: local object root (default: ./data/objects)
    /// - FRAGMENTS_S3_BUCKET: bucket name, required for s3
    /// - AWS_REGION: bucket region (default: us-east-1)
    /// - FRAGMENTS_S3_ENDPOINT: custom S3-compatible endpoint (optional)
    /// - FRAGMENTS_OBJECT_PREFIX: key prefix for payloads (default: fragments)
    /// - FRAGMENTS_STORAGE_TIMEOUT_MS: per-call timeout (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = get("FRAGMENTS_BACKEND").unwrap_or_else(|| "memory".to_string());
        match backend.to_ascii_lowercase().as_str() {
            "memory" => return Ok(BackendConfig::Memory),
            "durable" => {}
            _ => return Err(ConfigError::UnknownBackend(backend)),
        }

        let timeout = match get("FRAGMENTS_STORAGE_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        let store = get("FRAGMENTS_OBJECT_STORE").unwrap_or_else(|| "local".to_string());
        let objects = match store.to_ascii_lowercase().as_str() {
            "local" => ObjectStoreConfig::Local {
                root: get("FRAGMENTS_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            },
            "memory" => ObjectStoreConfig::Memory,
            "s3" => {
                let bucket = get("FRAGMENTS_S3_BUCKET").ok_or(ConfigError::MissingBucket)?;
                let region = get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
                let s3 = S3Config::aws(bucket, region);
                ObjectStoreConfig::S3(match get("FRAGMENTS_S3_ENDPOINT") {
                    Some(endpoint) => s3.with_endpoint(endpoint),
                    None => s3,
                })
            }
            _ => return Err(ConfigError::UnknownObjectStore(store)),
        };

        Ok(BackendConfig::Durable(DurableConfig {
            metadata_path: PathBuf::from(
                get("FRAGMENTS_METADATA_PATH").unwrap_or_else(|| DEFAULT_METADATA_PATH.to_string()),
            ),
            objects,
            prefix: get("FRAGMENTS_OBJECT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            timeout,
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::Durable(_) => "durable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<BackendConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BackendConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_memory() {
        assert_eq!(load(&[]).unwrap(), BackendConfig::Memory);
        assert_eq!(load(&[("FRAGMENTS_BACKEND", "")]).unwrap(), BackendConfig::Memory);
    }

    #[test]
    fn durable_defaults_to_local_objects() {
        let config = load(&[("FRAGMENTS_BACKEND", "durable")]).unwrap();
        let BackendConfig::Durable(durable) = config else {
            panic!("expected durable config");
        };
        assert_eq!(durable.metadata_path, PathBuf::from("./data/fragments.db"));
        assert_eq!(
            durable.objects,
            ObjectStoreConfig::Local {
                root: PathBuf::from("./data/objects")
            }
        );
        assert_eq!(durable.prefix, "fragments");
        assert_eq!(durable.timeout, Duration::from_secs(5));
    }

    #[test]
    fn s3_requires_bucket() {
        let err = load(&[("FRAGMENTS_BACKEND", "durable"), ("FRAGMENTS_OBJECT_STORE", "s3")])
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingBucket);
        assert!(err.to_string().contains("FRAGMENTS_S3_BUCKET"));
    }

    #[test]
    fn s3_with_custom_endpoint() {
        let config = load(&[
            ("FRAGMENTS_BACKEND", "durable"),
            ("FRAGMENTS_OBJECT_STORE", "s3"),
            ("FRAGMENTS_S3_BUCKET", "frags"),
            ("AWS_REGION", "eu-west-2"),
            ("FRAGMENTS_S3_ENDPOINT", "http://localhost:9000"),
            ("FRAGMENTS_STORAGE_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        let BackendConfig::Durable(durable) = config else {
            panic!("expected durable config");
        };
        let ObjectStoreConfig::S3(s3) = &durable.objects else {
            panic!("expected s3 objects");
        };
        assert_eq!(s3.bucket, "frags");
        assert_eq!(s3.region, "eu-west-2");
        assert!(s3.allow_http);
        assert_eq!(durable.timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_unknown_values() {
        assert_eq!(
            load(&[("FRAGMENTS_BACKEND", "redis")]).unwrap_err(),
            ConfigError::UnknownBackend("redis".into())
        );
        let store = load(&[("FRAGMENTS_BACKEND", "durable"), ("FRAGMENTS_OBJECT_STORE", "ftp")]);
        assert_eq!(store.unwrap_err(), ConfigError::UnknownObjectStore("ftp".into()));
        for bad in ["0", "-5", "soon"] {
            let timeout =
                load(&[("FRAGMENTS_BACKEND", "durable"), ("FRAGMENTS_STORAGE_TIMEOUT_MS", bad)]);
            assert_eq!(timeout.unwrap_err(), ConfigError::InvalidTimeout(bad.into()));
        }
    }
}
