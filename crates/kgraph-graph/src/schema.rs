//! Neo4j schema initialization (constraints and indexes).

use tracing::info;

use kgraph_core::KgResult;

use crate::client::GraphClient;
use crate::statement::Statement;

/// Cypher statements for schema initialization.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // One node per external id, whatever its specific label
    "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (e:Entity) REQUIRE e.id IS UNIQUE",
    // Full-text search over display names
    "CREATE FULLTEXT INDEX entity_name_search IF NOT EXISTS FOR (e:Entity) ON EACH [e.name]",
];

/// Initialize Neo4j schema with constraints and indexes.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses. Schema commands
/// cannot share a transaction with each other, so each runs on its own.
pub async fn initialize_schema(client: &GraphClient) -> KgResult<()> {
    info!("Initializing Neo4j schema...");

    for text in SCHEMA_STATEMENTS {
        client.execute_write(&[Statement::new(*text)]).await?;
    }

    info!("Neo4j schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
    Ok(())
}
