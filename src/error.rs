use crate::embedding::EmbeddingError;
use crate::index::{IndexError, SnapshotError};
use crate::synthesis::SynthesisError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docqa
#[derive(Error, Debug)]
pub enum DocqaError {
    /// A document source could not be read
    #[error("Document source not found or unreadable: {path}: {source}")]
    SourceNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Embedding backend failure or malformed input
    #[error("Embedding failed: {0}")]
    Embedding(#[source] EmbeddingError),

    /// Vector dimensions disagree between embedder and index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller passed an invalid `k` or chunking parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Answer synthesis backend failure
    #[error("Answer generation failed: {0}")]
    Generation(#[from] SynthesisError),

    /// Query issued before any index was loaded
    #[error("No index loaded; call load() first")]
    NotLoaded,

    /// Persisted index unreadable or incompatible
    #[error("Index snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },
}

impl DocqaError {
    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Only backend failures on the query path qualify; argument errors,
    /// dimension drift and missing sources never go away on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            DocqaError::Embedding(e) => e.is_retryable(),
            DocqaError::Generation(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<EmbeddingError> for DocqaError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            // Vector length drift is fatal, not a backend hiccup
            EmbeddingError::DimensionMismatch { expected, actual } => {
                DocqaError::DimensionMismatch { expected, actual }
            }
            other => DocqaError::Embedding(other),
        }
    }
}

impl From<IndexError> for DocqaError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { expected, actual } => {
                DocqaError::DimensionMismatch { expected, actual }
            }
            IndexError::InvalidArgument(message) => DocqaError::InvalidArgument(message),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for docqa operations
pub type Result<T> = std::result::Result<T, DocqaError>;
