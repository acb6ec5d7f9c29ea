//! Graph projection.
//!
//! Store values are serialized into plain JSON before they reach this
//! module. Nodes look like `{labels, internalId, properties}` and
//! relationships like `{type, internalId, startInternalId, endInternalId,
//! properties}`. The builders below are the single definition of that shape.

pub mod model;

use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::fact::model::BASE_LABEL;
use model::{Record, ViewEdge, ViewGraph, ViewNode};

/// Serialized form of a store node.
pub fn node_value(labels: Vec<String>, internal_id: i64, properties: Map<String, Value>) -> Value {
    json!({
        "labels": labels,
        "internalId": internal_id,
        "properties": properties,
    })
}

/// Serialized form of a store relationship. Endpoints are absent for
/// relationships that arrive without them (inside a path before resolution).
pub fn relationship_value(
    rel_type: &str,
    internal_id: i64,
    endpoints: Option<(i64, i64)>,
    properties: Map<String, Value>,
) -> Value {
    let mut value = json!({
        "type": rel_type,
        "internalId": internal_id,
        "properties": properties,
    });
    if let (Some((start, end)), Some(map)) = (endpoints, value.as_object_mut()) {
        map.insert("startInternalId".to_string(), Value::from(start));
        map.insert("endInternalId".to_string(), Value::from(end));
    }
    value
}

/// Project `(start, rel, end)` columns of each record into a view graph.
///
/// Nodes are keyed by their `id` property, falling back to the internal id.
/// The first occurrence of a node fixes its display fields. Nodes keep
/// first-seen order and edges keep record order. Records missing any of
/// the three columns are skipped.
pub fn project(records: &[Record], start: &str, rel: &str, end: &str) -> ViewGraph {
    let mut projector = Projector::default();

    for (row, record) in records.iter().enumerate() {
        let (Some(a), Some(r), Some(b)) = (record.get(start), record.get(rel), record.get(end)) else {
            debug!(row, "Skipping record without a node-relationship-node triple");
            continue;
        };
        if !(is_node(a) && is_node(b)) {
            debug!(row, "Skipping record with a non-node endpoint");
            continue;
        }
        projector.put_node(a);
        projector.put_node(b);
        projector.put_edge(r);
    }

    projector.graph
}

#[derive(Default)]
struct Projector {
    graph: ViewGraph,
    seen: HashSet<String>,
    external_by_internal: HashMap<String, String>,
}

impl Projector {
    fn put_node(&mut self, value: &Value) {
        let Some(node) = value.as_object() else {
            return;
        };
        let Some(internal) = node.get("internalId").and_then(id_text) else {
            return;
        };
        let props = node
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let id = props.get("id").and_then(id_text).unwrap_or_else(|| internal.clone());
        self.external_by_internal.insert(internal, id.clone());

        if self.seen.insert(id.clone()) {
            let title = props
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());
            self.graph.nodes.push(ViewNode {
                id,
                label: display_label(node.get("labels")),
                title,
                props,
            });
        }
    }

    fn put_edge(&mut self, value: &Value) {
        let Some(rel) = value.as_object() else {
            return;
        };
        let resolve = |key: &str| -> String {
            let internal = rel.get(key).and_then(id_text).unwrap_or_default();
            self.external_by_internal
                .get(&internal)
                .cloned()
                .unwrap_or(internal)
        };
        let edge = ViewEdge {
            from: resolve("startInternalId"),
            to: resolve("endInternalId"),
            label: rel
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            props: rel
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        };
        self.graph.edges.push(edge);
    }
}

fn is_node(value: &Value) -> bool {
    value.get("internalId").is_some() && value.get("labels").is_some()
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display_label(labels: Option<&Value>) -> String {
    let labels: Vec<&str> = labels
        .and_then(Value::as_array)
        .map(|all| all.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let specific: Vec<&str> = labels.iter().copied().filter(|l| *l != BASE_LABEL).collect();
    if specific.is_empty() {
        labels.join("/")
    } else {
        specific.join("/")
    }
}
