//! Graph store connection client.
//!
//! Holds one shared session behind a swappable slot. A transient failure
//! rebuilds the session and retries the operation once; a second failure
//! drops the session so the next caller starts from a fresh connection.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use kgraph_core::{GraphConfig, KgError, KgResult, Record};

use crate::backend::{GraphBackend, GraphSession, StoreError, StoreResult};
use crate::neo4j::Neo4jBackend;
use crate::statement::Statement;

/// Client for knowledge graph store operations.
///
/// Cheap to clone; clones share the same session slot.
#[derive(Clone)]
pub struct GraphClient {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Box<dyn GraphBackend>,
    slot: RwLock<Option<Slot>>,
    /// Serializes rebuilds; holds the last generation handed out.
    rebuild: Mutex<u64>,
}

#[derive(Clone)]
struct Slot {
    session: Arc<dyn GraphSession>,
    generation: u64,
}

impl GraphClient {
    /// Wrap a backend without opening a session yet.
    pub fn new(backend: impl GraphBackend + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Box::new(backend),
                slot: RwLock::new(None),
                rebuild: Mutex::new(0),
            }),
        }
    }

    /// Client for a Neo4j store, opened lazily.
    pub fn neo4j(config: &GraphConfig) -> Self {
        Self::new(Neo4jBackend::new(config.clone()))
    }

    /// Connect to Neo4j and verify the store answers.
    pub async fn connect(config: &GraphConfig) -> KgResult<Self> {
        let client = Self::neo4j(config);
        client.init().await?;
        Ok(client)
    }

    /// Open the session now instead of on first use.
    pub async fn init(&self) -> KgResult<()> {
        self.current().await.map(|_| ())
    }

    /// Run a read statement and return its rows.
    pub async fn execute(&self, statement: &Statement) -> KgResult<Vec<Record>> {
        self.with_retry(
            |session| async move { session.fetch(statement).await },
            |code, message| KgError::Query { code, message },
        )
        .await
    }

    /// Run statements in order inside one transaction.
    pub async fn execute_write(&self, statements: &[Statement]) -> KgResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        self.with_retry(
            |session| async move { session.apply(statements).await },
            |code, message| KgError::StoreWriteFailed(format!("{}: {}", code, message)),
        )
        .await
    }

    /// Run a statement and decode one column of the first row.
    pub async fn query_scalar<T: DeserializeOwned>(
        &self,
        statement: &Statement,
        field: &str,
    ) -> KgResult<Option<T>> {
        let rows = self.execute(statement).await?;
        match rows.into_iter().next().and_then(|mut row| row.remove(field)) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Get node and relationship counts for status display.
    pub async fn get_counts(&self) -> KgResult<GraphCounts> {
        let nodes: i64 = self
            .query_scalar(&Statement::new("MATCH (n) RETURN count(n) AS count"), "count")
            .await?
            .unwrap_or(0);
        let relationships: i64 = self
            .query_scalar(&Statement::new("MATCH ()-[r]->() RETURN count(r) AS count"), "count")
            .await?
            .unwrap_or(0);

        Ok(GraphCounts {
            nodes: nodes.max(0) as u64,
            relationships: relationships.max(0) as u64,
        })
    }

    /// True when the store answers a trivial query.
    pub async fn ping(&self) -> bool {
        match self.execute(&Statement::new("RETURN 1 AS ok")).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Graph store ping failed");
                false
            }
        }
    }

    /// Drop the current session. The next operation opens a new one.
    pub async fn close(&self) {
        if self.inner.slot.write().await.take().is_some() {
            info!("Graph store session closed");
        }
    }

    async fn current(&self) -> KgResult<Slot> {
        if let Some(slot) = self.inner.slot.read().await.clone() {
            return Ok(slot);
        }
        self.rebuild(None).await
    }

    /// Open a new session unless another caller already replaced `stale`.
    async fn rebuild(&self, stale: Option<u64>) -> KgResult<Slot> {
        let mut last_generation = self.inner.rebuild.lock().await;

        if let Some(slot) = self.inner.slot.read().await.clone() {
            if Some(slot.generation) != stale {
                return Ok(slot);
            }
        }

        let session = match self.inner.backend.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Could not open graph store session");
                if let Some(generation) = stale {
                    self.invalidate(generation).await;
                }
                return Err(KgError::StoreUnavailable(e.to_string()));
            }
        };

        *last_generation += 1;
        let slot = Slot {
            session,
            generation: *last_generation,
        };
        *self.inner.slot.write().await = Some(slot.clone());
        info!(generation = slot.generation, "Graph store session opened");
        Ok(slot)
    }

    async fn invalidate(&self, generation: u64) {
        let mut slot = self.inner.slot.write().await;
        if slot.as_ref().is_some_and(|s| s.generation == generation) {
            *slot = None;
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        op: F,
        on_reject: impl Fn(String, String) -> KgError,
    ) -> KgResult<T>
    where
        F: Fn(Arc<dyn GraphSession>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let slot = self.current().await?;

        let first = match op(slot.session.clone()).await {
            Ok(value) => return Ok(value),
            Err(StoreError::Rejected { code, message }) => return Err(on_reject(code, message)),
            Err(StoreError::Transient(reason)) => reason,
        };
        warn!(error = %first, generation = slot.generation, "Transient store failure, reconnecting");

        let slot = self.rebuild(Some(slot.generation)).await?;
        match op(slot.session.clone()).await {
            Ok(value) => Ok(value),
            Err(StoreError::Rejected { code, message }) => Err(on_reject(code, message)),
            Err(StoreError::Transient(reason)) => {
                warn!(error = %reason, "Store still failing after reconnect");
                self.invalidate(slot.generation).await;
                Err(KgError::StoreUnavailable(reason))
            }
        }
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct GraphCounts {
    pub nodes: u64,
    pub relationships: u64,
}
