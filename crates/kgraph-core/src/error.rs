//! Centralized error types for kgraph.

use std::time::Duration;

use thiserror::Error;

use crate::query::Rejection;

/// Main error type for kgraph operations.
#[derive(Error, Debug)]
pub enum KgError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Blank identifier after normalization at {0}")]
    BlankIdentifier(String),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Graph store write failed: {0}")]
    StoreWriteFailed(String),

    #[error("{code}: {message}")]
    Query { code: String, message: String },

    #[error("Query rejected: {0}")]
    QueryRejected(Rejection),

    #[error("Extraction timed out after {0:?}")]
    ExtractionTimeout(Duration),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for kgraph operations.
pub type KgResult<T> = Result<T, KgError>;

impl KgError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by the caller's input rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::BlankIdentifier(_))
    }
}
