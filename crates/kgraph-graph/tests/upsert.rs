//! Upsert semantics checked against an in-memory graph that applies the
//! statement parameters the way the MERGE statements do.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use kgraph_core::{Entity, IngestBatch, KgError, NodeLabel, Record, RelType, Relationship};
use kgraph_graph::{
    ingest, upsert_entities, upsert_relationships, GraphBackend, GraphClient, GraphSession,
    Statement, StoreResult,
};

#[derive(Debug, Clone, Default)]
struct Node {
    labels: BTreeSet<String>,
    props: Map<String, Value>,
}

#[derive(Default)]
struct FakeGraph {
    nodes: Mutex<HashMap<String, Node>>,
    edges: Mutex<HashMap<(String, String, String), Map<String, Value>>>,
    opens: AtomicUsize,
    transactions: AtomicUsize,
}

impl FakeGraph {
    fn node(&self, id: &str) -> Option<Node> {
        self.nodes.lock().unwrap().get(id).cloned()
    }

    fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    fn merge_entities(&self, rows: &[Value]) {
        let mut nodes = self.nodes.lock().unwrap();
        for row in rows {
            let id = row["id"].as_str().unwrap().to_string();
            let node = nodes.entry(id.clone()).or_default();
            node.props.insert("id".into(), json!(id));
            node.props.extend(row["props"].as_object().cloned().unwrap_or_default());
            if let Some(name) = row["name"].as_str() {
                node.props.insert("name".into(), json!(name));
            }
            node.labels.insert("Entity".into());
            node.labels.insert(row["label"].as_str().unwrap().to_string());
        }
    }

    fn merge_relationships(&self, text: &str, rows: &[Value]) {
        let nodes = self.nodes.lock().unwrap();
        let mut edges = self.edges.lock().unwrap();
        for row in rows {
            let subj = row["subj"].as_str().unwrap().to_string();
            let pred = row["pred"].as_str().unwrap().to_string();
            let obj = row["obj"].as_str().unwrap().to_string();
            assert!(text.contains(&format!("[rel:{}]", pred)));
            if !nodes.contains_key(&subj) || !nodes.contains_key(&obj) {
                continue;
            }
            edges
                .entry((subj, pred, obj))
                .or_default()
                .extend(row["props"].as_object().cloned().unwrap_or_default());
        }
    }
}

struct FakeBackend(Arc<FakeGraph>);

#[async_trait]
impl GraphBackend for FakeBackend {
    async fn open(&self) -> StoreResult<Arc<dyn GraphSession>> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSession(self.0.clone())))
    }
}

struct FakeSession(Arc<FakeGraph>);

#[async_trait]
impl GraphSession for FakeSession {
    async fn fetch(&self, _statement: &Statement) -> StoreResult<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn apply(&self, statements: &[Statement]) -> StoreResult<()> {
        self.0.transactions.fetch_add(1, Ordering::SeqCst);
        for statement in statements {
            if let Some(rows) = statement.params().get("entities").and_then(Value::as_array) {
                self.0.merge_entities(rows);
            }
            if let Some(rows) = statement.params().get("rels").and_then(Value::as_array) {
                self.0.merge_relationships(statement.text(), rows);
            }
        }
        Ok(())
    }
}

fn setup() -> (Arc<FakeGraph>, GraphClient) {
    let graph = Arc::new(FakeGraph::default());
    let client = GraphClient::new(FakeBackend(graph.clone()));
    (graph, client)
}

#[tokio::test]
async fn test_upsert_is_idempotent_and_merges_props() {
    let (graph, client) = setup();
    let alice = Entity::new("user:alice", NodeLabel::Person)
        .with_name("Alice")
        .with_prop("age", 30)
        .with_prop("city", "Paris");

    upsert_entities(&client, &[alice.clone()]).await.unwrap();
    upsert_entities(&client, &[alice]).await.unwrap();
    assert_eq!(graph.node_count(), 1);

    let changed = Entity::new("user:alice", NodeLabel::Person).with_prop("city", "Lyon");
    upsert_entities(&client, &[changed]).await.unwrap();

    let node = graph.node("user:alice").unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(node.props["city"], json!("Lyon"));
    assert_eq!(node.props["age"], json!(30));
    assert_eq!(node.props["name"], json!("Alice"));
}

#[tokio::test]
async fn test_null_prop_does_not_erase_stored_value() {
    let (graph, client) = setup();
    let first = Entity::new("org:acme", NodeLabel::Org).with_prop("sector", "retail");
    let second = Entity::new("org:acme", NodeLabel::Org).with_prop("sector", Value::Null);

    upsert_entities(&client, &[first]).await.unwrap();
    upsert_entities(&client, &[second]).await.unwrap();

    assert_eq!(graph.node("org:acme").unwrap().props["sector"], json!("retail"));
}

#[tokio::test]
async fn test_batch_relationships_see_same_batch_entities() {
    let (graph, client) = setup();
    let batch = IngestBatch {
        entities: vec![
            Entity::new(" user:alice ", NodeLabel::Person).with_name(" Alice "),
            Entity::new("place:paris", NodeLabel::Place).with_name("Paris"),
        ],
        relationships: vec![
            Relationship::new("user:alice", RelType::LivesIn, "place:paris").with_prop("since", 2019),
            Relationship::new("user:alice", RelType::FriendOf, "user:nobody"),
        ],
    };

    let summary = ingest(&client, &batch).await.unwrap();
    ingest(&client, &batch).await.unwrap();

    assert_eq!(summary.entities, 2);
    assert_eq!(summary.relationships, 2);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.node("user:alice").unwrap().props["name"], json!("Alice"));
    assert!(graph.node("place:paris").unwrap().labels.contains("Place"));
    assert_eq!(graph.transactions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_relationship_props_merge() {
    let (graph, client) = setup();
    let people = [
        Entity::new("user:a", NodeLabel::Person),
        Entity::new("user:b", NodeLabel::Person),
    ];
    upsert_entities(&client, &people).await.unwrap();

    let first = Relationship::new("user:a", RelType::MetWith, "user:b").with_prop("where", "cafe");
    let second = Relationship::new("user:a", RelType::MetWith, "user:b").with_prop("when", "monday");
    upsert_relationships(&client, &[first]).await.unwrap();
    upsert_relationships(&client, &[second]).await.unwrap();

    let edges = graph.edges.lock().unwrap();
    let props = &edges[&("user:a".to_string(), "MET_WITH".to_string(), "user:b".to_string())];
    assert_eq!(props["where"], json!("cafe"));
    assert_eq!(props["when"], json!("monday"));
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn test_empty_batch_never_touches_store() {
    let (graph, client) = setup();

    let summary = ingest(&client, &IngestBatch::default()).await.unwrap();

    assert_eq!(summary.entities, 0);
    assert_eq!(graph.opens.load(Ordering::SeqCst), 0);
    assert_eq!(graph.transactions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_identifier_rejects_before_any_write() {
    let (graph, client) = setup();
    let batch = IngestBatch {
        entities: vec![Entity::new("user:a", NodeLabel::Person)],
        relationships: vec![Relationship::new("user:a", RelType::Owns, "   ")],
    };

    let err = ingest(&client, &batch).await.unwrap_err();

    assert!(matches!(err, KgError::BlankIdentifier(ref path) if path == "triples[0].obj"));
    assert_eq!(graph.transactions.load(Ordering::SeqCst), 0);
    assert_eq!(graph.node_count(), 0);
}

#[tokio::test]
async fn test_unknown_predicate_rejected_at_the_boundary() {
    let body = json!({
        "entities": [{"id": "user:a", "label": "Person"}],
        "triples": [{"subj": "user:a", "pred": "LIKES", "obj": "user:b"}],
    });

    let err = serde_json::from_value::<IngestBatch>(body).unwrap_err();
    assert!(err.to_string().contains("unknown relationship type 'LIKES'"));
}
