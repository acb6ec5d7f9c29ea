//! Neo4j backend built on neo4rs.
//!
//! Converts statement parameters to Bolt values and Bolt result values to
//! the plain JSON shape the rest of the pipeline works with.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNode, BoltNull, BoltPath,
    BoltString, BoltType, BoltUnboundedRelation, ConfigBuilder, Graph, Query, Row,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use kgraph_core::view::{node_value, relationship_value};
use kgraph_core::{GraphConfig, Record};

use crate::backend::{GraphBackend, GraphSession, StoreError, StoreResult};
use crate::statement::Statement;

/// Opens neo4rs connection pools.
pub struct Neo4jBackend {
    config: GraphConfig,
}

impl Neo4jBackend {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GraphBackend for Neo4jBackend {
    /// neo4rs pools are lazy: `Graph::connect` does not open a bolt
    /// connection. The `RETURN 1` ping forces the handshake so an
    /// unreachable store fails here instead of on the first real query.
    async fn open(&self) -> StoreResult<Arc<dyn GraphSession>> {
        let config = ConfigBuilder::default()
            .uri(&self.config.uri)
            .user(&self.config.user)
            .password(&self.config.password)
            .db(self.config.database.as_str())
            .max_connections(self.config.max_connections)
            .fetch_size(self.config.fetch_size)
            .build()?;

        let graph = Graph::connect(config).await?;
        graph.run(Query::new("RETURN 1".to_string())).await?;

        debug!(uri = %self.config.uri, database = %self.config.database, "Neo4j connection verified");
        Ok(Arc::new(Neo4jSession { graph }))
    }
}

struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn fetch(&self, statement: &Statement) -> StoreResult<Vec<Record>> {
        let mut stream = self.graph.execute(to_query(statement)).await?;

        let mut records = Vec::new();
        while let Some(row) = stream.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn apply(&self, statements: &[Statement]) -> StoreResult<()> {
        let mut txn = self.graph.start_txn().await?;

        for statement in statements {
            let outcome = txn.run(to_query(statement)).await;
            if let Err(err) = outcome {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback after failed statement also failed");
                }
                return Err(err.into());
            }
        }

        txn.commit().await?;
        Ok(())
    }
}

impl From<neo4rs::Error> for StoreError {
    fn from(err: neo4rs::Error) -> Self {
        match &err {
            neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
                StoreError::Transient(err.to_string())
            }
            neo4rs::Error::Neo4j(e) if e.code().starts_with("Neo.TransientError") => {
                StoreError::Transient(format!("{}: {}", e.code(), e.message()))
            }
            neo4rs::Error::Neo4j(e) => StoreError::rejected(e.code(), e.message()),
            _ => StoreError::rejected("Neo.ClientError.Driver", err.to_string()),
        }
    }
}

/// Build a neo4rs query from a statement.
pub fn to_query(statement: &Statement) -> Query {
    statement
        .params()
        .iter()
        .fold(Query::new(statement.text().to_string()), |query, (key, value)| {
            query.param(key, json_to_bolt(value))
        })
}

fn row_to_record(row: &Row) -> StoreResult<Record> {
    let columns: HashMap<String, BoltType> = row.to_strict().map_err(|err| {
        StoreError::rejected("Neo.ClientError.Driver", format!("could not decode result row: {}", err))
    })?;
    Ok(columns
        .iter()
        .map(|(name, value)| (name.clone(), bolt_to_json(value)))
        .collect())
}

/// Convert a JSON parameter into a Bolt value.
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => BoltType::String(BoltString::new(s)),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(entries) => {
            let mut map = BoltMap::new();
            for (key, item) in entries {
                map.put(BoltString::new(key), json_to_bolt(item));
            }
            BoltType::Map(map)
        }
    }
}

/// Convert a Bolt result value into plain JSON.
///
/// Nodes, relationships and paths use the shapes defined in
/// `kgraph_core::view`. Temporal and spatial values render as text.
pub fn bolt_to_json(value: &BoltType) -> Value {
    match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::from(i.value),
        BoltType::Float(f) => serde_json::Number::from_f64(f.value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        BoltType::String(s) => Value::String(s.value.clone()),
        BoltType::List(list) => Value::Array(list.value.iter().map(bolt_to_json).collect()),
        BoltType::Map(map) => Value::Object(map_to_json(map)),
        BoltType::Bytes(bytes) => Value::Array(bytes.value.iter().map(|b| Value::from(*b)).collect()),
        BoltType::Node(node) => node_to_json(node),
        BoltType::Relation(rel) => relationship_value(
            &rel.typ.value,
            rel.id.value,
            Some((rel.start_node_id.value, rel.end_node_id.value)),
            map_to_json(&rel.properties),
        ),
        BoltType::UnboundedRelation(rel) => unbounded_to_json(rel, None),
        BoltType::Path(path) => path_to_json(path),
        other => Value::String(format!("{:?}", other)),
    }
}

fn map_to_json(map: &BoltMap) -> Map<String, Value> {
    map.value
        .iter()
        .map(|(key, value)| (key.value.clone(), bolt_to_json(value)))
        .collect()
}

fn node_to_json(node: &BoltNode) -> Value {
    let labels = node
        .labels
        .value
        .iter()
        .filter_map(|label| match label {
            BoltType::String(s) => Some(s.value.clone()),
            _ => None,
        })
        .collect();
    node_value(labels, node.id.value, map_to_json(&node.properties))
}

fn unbounded_to_json(rel: &BoltUnboundedRelation, endpoints: Option<(i64, i64)>) -> Value {
    relationship_value(&rel.typ.value, rel.id.value, endpoints, map_to_json(&rel.properties))
}

/// Paths carry unique nodes and relationships plus an index sequence of
/// `(relationship, node)` pairs. Relationship indices are 1-based and
/// negative when the step runs against the relationship's direction.
fn path_to_json(path: &BoltPath) -> Value {
    let nodes: Vec<&BoltNode> = path
        .nodes
        .value
        .iter()
        .filter_map(|n| match n {
            BoltType::Node(node) => Some(node),
            _ => None,
        })
        .collect();
    let rels: Vec<&BoltUnboundedRelation> = path
        .rels
        .value
        .iter()
        .filter_map(|r| match r {
            BoltType::UnboundedRelation(rel) => Some(rel),
            _ => None,
        })
        .collect();
    let indices: Vec<i64> = path
        .indices
        .value
        .iter()
        .filter_map(|i| match i {
            BoltType::Integer(i) => Some(i.value),
            _ => None,
        })
        .collect();

    let mut ordered_nodes: Vec<Value> = nodes.first().map(|n| node_to_json(n)).into_iter().collect();
    let mut relationships = Vec::new();
    let mut previous = nodes.first().map(|n| n.id.value);

    for step in indices.chunks_exact(2) {
        let (rel_index, node_index) = (step[0], step[1]);
        let next = usize::try_from(node_index).ok().and_then(|i| nodes.get(i));
        let rel = usize::try_from(rel_index.unsigned_abs())
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| rels.get(i));

        if let (Some(prev), Some(next), Some(rel)) = (previous, next, rel) {
            let endpoints = if rel_index > 0 {
                (prev, next.id.value)
            } else {
                (next.id.value, prev)
            };
            relationships.push(unbounded_to_json(rel, Some(endpoints)));
            ordered_nodes.push(node_to_json(next));
        }
        previous = next.map(|n| n.id.value);
    }

    serde_json::json!({
        "nodes": ordered_nodes,
        "relationships": relationships,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo4rs::BoltRelation;
    use serde_json::json;

    fn props(pairs: &[(&str, &str)]) -> BoltMap {
        pairs
            .iter()
            .map(|(k, v)| (BoltString::new(k), BoltType::String(BoltString::new(v))))
            .collect()
    }

    fn labels(names: &[&str]) -> BoltList {
        names
            .iter()
            .map(|n| BoltType::String(BoltString::new(n)))
            .collect::<Vec<_>>()
            .into()
    }

    fn node(internal: i64, id: &str) -> BoltNode {
        BoltNode::new(
            BoltInteger::new(internal),
            labels(&["Entity", "Person"]),
            props(&[("id", id)]),
        )
    }

    fn unbounded(internal: i64, typ: &str) -> BoltUnboundedRelation {
        BoltUnboundedRelation::new(BoltInteger::new(internal), BoltString::new(typ), BoltMap::new())
    }

    fn ints(values: &[i64]) -> BoltList {
        values
            .iter()
            .map(|v| BoltType::Integer(BoltInteger::new(*v)))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_scalar_round_trip_through_bolt() {
        let params = json!({
            "id": "user:a",
            "age": 42,
            "score": 0.5,
            "active": true,
            "tags": ["a", "b"],
            "nothing": null,
        });
        let bolt = json_to_bolt(&params);
        assert_eq!(bolt_to_json(&bolt), params);
    }

    #[test]
    fn test_node_to_json() {
        let value = bolt_to_json(&BoltType::Node(node(7, "user:alice")));
        assert_eq!(
            value,
            node_value(
                vec!["Entity".into(), "Person".into()],
                7,
                Map::from_iter([("id".to_string(), json!("user:alice"))]),
            )
        );
    }

    #[test]
    fn test_relationship_keeps_endpoints() {
        let rel = BoltRelation {
            id: BoltInteger::new(10),
            start_node_id: BoltInteger::new(1),
            end_node_id: BoltInteger::new(2),
            typ: BoltString::new("FRIEND_OF"),
            properties: props(&[("since", "2020")]),
        };
        let value = bolt_to_json(&BoltType::Relation(rel));
        assert_eq!(
            value,
            relationship_value(
                "FRIEND_OF",
                10,
                Some((1, 2)),
                Map::from_iter([("since".to_string(), json!("2020"))]),
            )
        );
    }

    #[test]
    fn test_unbounded_relationship_has_no_endpoints() {
        let value = bolt_to_json(&BoltType::UnboundedRelation(unbounded(11, "MET_WITH")));
        assert_eq!(value, relationship_value("MET_WITH", 11, None, Map::new()));
    }

    #[test]
    fn test_path_resolves_direction_per_step() {
        // a-[10]->b<-[11]-c
        let path = BoltPath {
            nodes: vec![
                BoltType::Node(node(1, "a")),
                BoltType::Node(node(2, "b")),
                BoltType::Node(node(3, "c")),
            ]
            .into(),
            rels: vec![
                BoltType::UnboundedRelation(unbounded(10, "FRIEND_OF")),
                BoltType::UnboundedRelation(unbounded(11, "FRIEND_OF")),
            ]
            .into(),
            indices: ints(&[1, 1, -2, 2]),
        };

        let value = bolt_to_json(&BoltType::Path(path));

        let ids: Vec<&Value> = value["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| &n["properties"]["id"])
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            value["relationships"],
            json!([
                relationship_value("FRIEND_OF", 10, Some((1, 2)), Map::new()),
                relationship_value("FRIEND_OF", 11, Some((3, 2)), Map::new()),
            ])
        );
    }

    #[test]
    fn test_row_decodes_every_column() {
        let row = Row::new(
            vec![
                BoltType::String(BoltString::new("name")),
                BoltType::String(BoltString::new("total")),
            ]
            .into(),
            vec![
                BoltType::String(BoltString::new("Alice")),
                BoltType::Integer(BoltInteger::new(3)),
            ]
            .into(),
        );

        let record = row_to_record(&row).unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record["name"], "Alice");
        assert_eq!(record["total"], 3);
    }
}
