//! Backend seam between the graph client and a concrete store driver.

use std::sync::Arc;

use async_trait::async_trait;
use kgraph_core::Record;
use thiserror::Error;

use crate::statement::Statement;

/// Failure reported by a store session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network or connection level failure; the session should be rebuilt.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The store refused the statement.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

impl StoreError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result type for store sessions.
pub type StoreResult<T> = Result<T, StoreError>;

/// Opens sessions against a graph store.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Open a session and verify the store answers before returning it.
    async fn open(&self) -> StoreResult<Arc<dyn GraphSession>>;
}

/// A live, shareable connection to the store.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run one statement and collect its rows.
    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Record>>;

    /// Run statements in order inside a single transaction.
    async fn apply(&self, statements: &[Statement]) -> StoreResult<()>;
}
