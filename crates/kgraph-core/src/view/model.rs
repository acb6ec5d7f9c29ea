//! Presentation graph models.

use serde::Serialize;
use serde_json::{Map, Value};

/// One result row: column name to serialized value.
pub type Record = Map<String, Value>;

/// A deduplicated node keyed by external id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    pub title: String,
    pub props: Map<String, Value>,
}

/// An edge between two resolved external ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub props: Map<String, Value>,
}

/// Node/edge view of a query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewGraph {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl ViewGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
