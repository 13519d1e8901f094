//! Error types for codegraph-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backing HTTP/database transport failed
    Backend,
    /// Serialization/deserialization errors
    Serialization,
    /// Collection does not exist and the call did not request auto-create
    CollectionNotFound,
    /// A sub-batch exhausted its retry budget
    Timeout,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Backend => "backend",
            ErrorKind::Serialization => "serialization",
            ErrorKind::CollectionNotFound => "collection_not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Backend, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::CollectionNotFound,
            format!("Collection not found: {}", name.into()),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// A transient error is safe to retry: request timeouts and 5xx responses.
    /// Anything else (4xx, malformed payloads) fails its sub-batch immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }
}

// JSON error conversions
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.status().map(|s| s.is_server_error()).unwrap_or(false) {
            StorageError::timeout(format!("request error: {}", err)).with_source(err)
        } else {
            StorageError::backend(format!("request error: {}", err)).with_source(err)
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
