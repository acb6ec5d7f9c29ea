//! Fact domain models: entities, relationships and ingest batches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::KgError;

/// Node label shared by every entity; identity is `(:Entity {id})`.
pub const BASE_LABEL: &str = "Entity";

/// Canonical node labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeLabel {
    Person,
    Place,
    Org,
    Goal,
    Event,
    Thing,
}

impl NodeLabel {
    pub const ALL: &'static [NodeLabel] = &[
        NodeLabel::Person,
        NodeLabel::Place,
        NodeLabel::Org,
        NodeLabel::Goal,
        NodeLabel::Event,
        NodeLabel::Thing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Person => "Person",
            NodeLabel::Place => "Place",
            NodeLabel::Org => "Org",
            NodeLabel::Goal => "Goal",
            NodeLabel::Event => "Event",
            NodeLabel::Thing => "Thing",
        }
    }
}

impl FromStr for NodeLabel {
    type Err = KgError;

    /// Exact match against the canonical spelling; nothing is coerced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| KgError::validation(format!("unknown node label '{}'", s)))
    }
}

impl TryFrom<String> for NodeLabel {
    type Error = KgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeLabel> for String {
    fn from(label: NodeLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelType {
    LivesIn,
    WorksAt,
    FriendOf,
    SiblingOf,
    MetWith,
    HasGoal,
    MemberOf,
    Attended,
    LocatedIn,
    Owns,
    PartOf,
}

impl RelType {
    pub const ALL: &'static [RelType] = &[
        RelType::LivesIn,
        RelType::WorksAt,
        RelType::FriendOf,
        RelType::SiblingOf,
        RelType::MetWith,
        RelType::HasGoal,
        RelType::MemberOf,
        RelType::Attended,
        RelType::LocatedIn,
        RelType::Owns,
        RelType::PartOf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::LivesIn => "LIVES_IN",
            RelType::WorksAt => "WORKS_AT",
            RelType::FriendOf => "FRIEND_OF",
            RelType::SiblingOf => "SIBLING_OF",
            RelType::MetWith => "MET_WITH",
            RelType::HasGoal => "HAS_GOAL",
            RelType::MemberOf => "MEMBER_OF",
            RelType::Attended => "ATTENDED",
            RelType::LocatedIn => "LOCATED_IN",
            RelType::Owns => "OWNS",
            RelType::PartOf => "PART_OF",
        }
    }

    /// Expected `(subject, object)` labels, used to describe the schema to
    /// the query translator. Not enforced on ingest.
    pub fn signature(&self) -> (NodeLabel, NodeLabel) {
        use NodeLabel::*;
        match self {
            RelType::LivesIn => (Person, Place),
            RelType::WorksAt => (Person, Org),
            RelType::FriendOf | RelType::SiblingOf | RelType::MetWith => (Person, Person),
            RelType::HasGoal => (Person, Goal),
            RelType::MemberOf => (Person, Org),
            RelType::Attended => (Person, Event),
            RelType::LocatedIn => (Org, Place),
            RelType::Owns => (Person, Thing),
            RelType::PartOf => (Thing, Thing),
        }
    }
}

impl FromStr for RelType {
    type Err = KgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|rel| rel.as_str() == s)
            .ok_or_else(|| KgError::validation(format!("unknown relationship type '{}'", s)))
    }
}

impl TryFrom<String> for RelType {
    type Error = KgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelType> for String {
    fn from(rel: RelType) -> Self {
        rel.as_str().to_string()
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node to upsert, identified by a stable external id such as `user:alice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub label: NodeLabel,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, label: NodeLabel) -> Self {
        Self {
            id: id.into(),
            label,
            name: None,
            props: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

/// A directed, typed edge between two entity ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub subj: String,
    pub pred: RelType,
    pub obj: String,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl Relationship {
    pub fn new(subj: impl Into<String>, pred: RelType, obj: impl Into<String>) -> Self {
        Self {
            subj: subj.into(),
            pred,
            obj: obj.into(),
            props: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

/// Entities and relationships processed together, so relationships can
/// reference entities created in the same call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default, rename = "triples", alias = "relationships")]
    pub relationships: Vec<Relationship>,
}

impl IngestBatch {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Counts of facts accepted by an ingest call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub entities: usize,
    #[serde(rename = "triples")]
    pub relationships: usize,
}
