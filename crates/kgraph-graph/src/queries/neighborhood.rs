//! Graph neighborhood exploration.
//!
//! Returns the direct relationships of one entity in both directions as a
//! deduplicated node/edge view.

use tracing::debug;

use kgraph_core::view::project;
use kgraph_core::{KgResult, ViewGraph};

use crate::client::GraphClient;
use crate::statement::Statement;

const NEIGHBORHOOD_QUERY: &str = "MATCH (a:Entity {id: $id})-[r]->(b) RETURN a, r, b
UNION
MATCH (a)-[r]->(b:Entity {id: $id}) RETURN a, r, b";

/// Explore the immediate neighborhood of an entity by external id.
///
/// An unknown id yields an empty graph.
pub async fn neighborhood(client: &GraphClient, entity_id: &str) -> KgResult<ViewGraph> {
    let statement = Statement::new(NEIGHBORHOOD_QUERY).param("id", entity_id.trim());
    let rows = client.execute(&statement).await?;

    let view = project(&rows, "a", "r", "b");
    debug!(
        entity_id,
        rows = rows.len(),
        nodes = view.nodes.len(),
        edges = view.edges.len(),
        "Neighborhood projected"
    );
    Ok(view)
}
