// ABOUTME: Error taxonomy shared by the fragment entity, the conversion engine, and their callers.
// ABOUTME: Storage failures arrive already translated by the backend and are surfaced generically.

use std::fmt;

use thiserror::Error;

use crate::backend::StorageError;

/// Which of the two records behind a fragment was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// No metadata record exists for the key.
    Fragment,
    /// The metadata record exists but its payload does not.
    Data,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Fragment => f.write_str("fragment"),
            Missing::Data => f.write_str("fragment data"),
        }
    }
}

/// Errors returned by fragment and conversion operations.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("invalid fragment: {0}")]
    Validation(String),

    #[error("{missing} not found: {id}")]
    NotFound { id: String, missing: Missing },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("cannot convert {from} to extension {extension:?}")]
    UnsupportedConversion { from: String, extension: String },

    #[error("fragment type cannot be changed after creation (stored {stored}, got {declared})")]
    TypeImmutable { stored: String, declared: String },

    #[error("could not convert fragment content: {0}")]
    ConversionFailed(String),

    /// The detail stays in the error source for logging; it is never part
    /// of the displayed message.
    #[error("internal storage error")]
    Storage(#[from] StorageError),
}

impl FragmentError {
    pub fn not_found(id: impl Into<String>, missing: Missing) -> Self {
        Self::NotFound {
            id: id.into(),
            missing,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FragmentError::NotFound { .. })
    }
}

pub type Result<T, E = FragmentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display_hides_provider_detail() {
        let err = FragmentError::from(StorageError::Backend {
            backend: "durable",
            operation: "get_data",
            message: "connection reset by peer at 10.0.0.4".to_string(),
        });
        assert_eq!(err.to_string(), "internal storage error");

        let source = std::error::Error::source(&err).expect("source kept for logs");
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn not_found_distinguishes_missing_record() {
        let meta = FragmentError::not_found("abc", Missing::Fragment);
        let data = FragmentError::not_found("abc", Missing::Data);
        assert_eq!(meta.to_string(), "fragment not found: abc");
        assert_eq!(data.to_string(), "fragment data not found: abc");
        assert!(meta.is_not_found() && data.is_not_found());
    }
}
