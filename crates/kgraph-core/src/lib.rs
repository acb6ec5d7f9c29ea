//! kgraph Core Library
//!
//! Domain models and the pure stages of the knowledge graph pipeline:
//! fact normalization, read-only query sanitization and result projection.

pub mod config;
pub mod error;
pub mod fact;
pub mod query;
pub mod view;

pub use config::{ExtractorMode, GraphConfig, LlmConfig, ServerConfig, Settings};
pub use error::{KgError, KgResult};
pub use fact::model::{Entity, IngestBatch, IngestSummary, NodeLabel, RelType, Relationship};
pub use query::{sanitize, Rejection, SafeQuery};
pub use view::model::{Record, ViewEdge, ViewGraph, ViewNode};
