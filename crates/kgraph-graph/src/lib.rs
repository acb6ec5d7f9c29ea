//! # kgraph Graph
//!
//! Neo4j integration for the knowledge graph.
//!
//! Provides the reconnecting store client, idempotent fact upserts,
//! schema bootstrap, seed scripts and the read queries behind the
//! neighborhood view and ad-hoc query endpoints.

pub mod backend;
pub mod client;
pub mod neo4j;
pub mod queries;
pub mod schema;
pub mod seed;
pub mod statement;
pub mod upsert;

pub use backend::{GraphBackend, GraphSession, StoreError, StoreResult};
pub use client::{GraphClient, GraphCounts};
pub use neo4j::Neo4jBackend;
pub use queries::{neighborhood, run_read_only, run_sanitized, QueryOutcome};
pub use schema::initialize_schema;
pub use seed::{run_file, run_script, split_script};
pub use statement::Statement;
pub use upsert::{ingest, upsert_batch, upsert_entities, upsert_relationships};
