// ABOUTME: Configuration loading for the fragments HTTP server.
// ABOUTME: Reads bind address, public API URL, and conversion worker count from the environment.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FRAGMENTS_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("FRAGMENTS_CONVERSION_WORKERS must be a positive integer, got '{0}'")]
    InvalidWorkers(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub api_url: String,
    pub conversion_workers: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - FRAGMENTS_BIND: socket address to bind (default: 127.0.0.1:8080)
    /// - FRAGMENTS_API_URL: public base URL (default: http://<bind>)
    /// - FRAGMENTS_CONVERSION_WORKERS: concurrent image conversions (default: available parallelism)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_str = get("FRAGMENTS_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let api_url = get("FRAGMENTS_API_URL").unwrap_or_else(|| format!("http://{}", bind));

        let conversion_workers = match get("FRAGMENTS_CONVERSION_WORKERS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidWorkers(raw)),
            },
            None => std::thread::available_parallelism().map_or(2, |n| n.get()),
        };

        Ok(Self {
            bind,
            api_url,
            conversion_workers,
        })
    }
}
