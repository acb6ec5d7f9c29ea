//! Reconnect and retry behavior of the graph client against a scripted backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use kgraph_core::{KgError, Record};
use kgraph_graph::{GraphBackend, GraphClient, GraphSession, Statement, StoreError, StoreResult};

#[derive(Default)]
struct State {
    opens: AtomicUsize,
    /// Number of upcoming `open` calls that fail.
    failing_opens: AtomicUsize,
    /// Sessions up to this generation fail every call transiently.
    dead_generations: usize,
    outcomes: Mutex<VecDeque<StoreResult<()>>>,
    calls: AtomicUsize,
}

impl State {
    fn with_outcomes(outcomes: Vec<StoreResult<()>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }

    fn next(&self, generation: usize) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if generation <= self.dead_generations {
            return Err(StoreError::Transient("connection reset".into()));
        }
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

struct ScriptedBackend(Arc<State>);

#[async_trait]
impl GraphBackend for ScriptedBackend {
    async fn open(&self) -> StoreResult<Arc<dyn GraphSession>> {
        tokio::task::yield_now().await;
        let failing = self.0.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.0.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(StoreError::Transient("connection refused".into()));
        }
        let generation = self.0.opens.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(ScriptedSession {
            generation,
            state: self.0.clone(),
        }))
    }
}

struct ScriptedSession {
    generation: usize,
    state: Arc<State>,
}

#[async_trait]
impl GraphSession for ScriptedSession {
    async fn fetch(&self, _statement: &Statement) -> StoreResult<Vec<Record>> {
        tokio::task::yield_now().await;
        self.state.next(self.generation)?;
        let mut row = Record::new();
        row.insert("generation".into(), json!(self.generation));
        Ok(vec![row])
    }

    async fn apply(&self, _statements: &[Statement]) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.state.next(self.generation)
    }
}

fn client(state: &Arc<State>) -> GraphClient {
    GraphClient::new(ScriptedBackend(state.clone()))
}

fn ping() -> Statement {
    Statement::new("RETURN 1")
}

#[tokio::test]
async fn test_transient_failure_then_success_is_hidden() {
    let state = State::with_outcomes(vec![Err(StoreError::Transient("broken pipe".into()))]);
    let client = client(&state);

    let rows = client.execute(&ping()).await.unwrap();

    assert_eq!(rows[0]["generation"], json!(2));
    assert_eq!(state.opens(), 2);
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_two_transient_failures_surface_unavailable() {
    let state = State::with_outcomes(vec![
        Err(StoreError::Transient("broken pipe".into())),
        Err(StoreError::Transient("broken pipe".into())),
    ]);
    let client = client(&state);

    let err = client.execute(&ping()).await.unwrap_err();
    assert!(matches!(err, KgError::StoreUnavailable(_)), "{err:?}");
    assert_eq!(state.opens(), 2);

    // The failed handle was dropped; the next request starts fresh.
    let rows = client.execute(&ping()).await.unwrap();
    assert_eq!(rows[0]["generation"], json!(3));
}

#[tokio::test]
async fn test_concurrent_failures_rebuild_once() {
    let state = Arc::new(State {
        dead_generations: 1,
        ..State::default()
    });
    let client = client(&state);

    let requests = (0..8).map(|_| {
        let client = client.clone();
        async move { client.execute(&ping()).await }
    });
    let results = futures::future::join_all(requests).await;

    for result in results {
        assert_eq!(result.unwrap()[0]["generation"], json!(2));
    }
    assert_eq!(state.opens(), 2);
}

#[tokio::test]
async fn test_open_failure_fails_fast() {
    let state = Arc::new(State::default());
    state.failing_opens.store(1, Ordering::SeqCst);
    let client = client(&state);

    let err = client.init().await.unwrap_err();
    assert!(matches!(err, KgError::StoreUnavailable(_)));
    assert_eq!(state.calls.load(Ordering::SeqCst), 0);

    assert!(client.ping().await);
    assert_eq!(state.opens(), 1);
}

#[tokio::test]
async fn test_rejected_read_is_a_query_error_without_reconnect() {
    let state = State::with_outcomes(vec![Err(StoreError::rejected(
        "Neo.ClientError.Statement.SyntaxError",
        "Invalid input 'MATC'",
    ))]);
    let client = client(&state);

    let err = client.execute(&Statement::new("MATC (n) RETURN n")).await.unwrap_err();
    match err {
        KgError::Query { code, message } => {
            assert_eq!(code, "Neo.ClientError.Statement.SyntaxError");
            assert_eq!(message, "Invalid input 'MATC'");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(state.opens(), 1);
}

#[tokio::test]
async fn test_rejected_write_is_a_write_failure() {
    let state = State::with_outcomes(vec![Err(StoreError::rejected(
        "Neo.ClientError.Schema.ConstraintValidationFailed",
        "already exists",
    ))]);
    let client = client(&state);

    let err = client.execute_write(&[ping()]).await.unwrap_err();
    assert!(matches!(err, KgError::StoreWriteFailed(ref m) if m.contains("ConstraintValidationFailed")));
}

#[tokio::test]
async fn test_empty_write_never_opens() {
    let state = Arc::new(State::default());
    let client = client(&state);

    client.execute_write(&[]).await.unwrap();
    assert_eq!(state.opens(), 0);
}

#[tokio::test]
async fn test_close_reopens_on_next_use() {
    let state = Arc::new(State::default());
    let client = client(&state);

    assert!(client.ping().await);
    client.close().await;
    assert!(client.ping().await);
    assert_eq!(state.opens(), 2);
}
