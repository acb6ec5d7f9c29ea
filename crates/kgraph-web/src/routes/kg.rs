//! Knowledge graph ingest and neighborhood view handlers.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use kgraph_core::{IngestBatch, ViewGraph};
use kgraph_llm::actor_entity_id;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub entities: usize,
    pub triples: usize,
}

/// Upsert entities and triples into the graph.
pub async fn ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestBatch>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(batch) = body?;
    let summary = kgraph_graph::ingest(&state.graph, &batch).await?;

    Ok(Json(IngestResponse {
        status: "ok",
        entities: summary.entities,
        triples: summary.relationships,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GraphViewParams {
    pub id: Option<String>,
    /// Shorthand for `id=user:<user_id>`.
    pub user_id: Option<String>,
}

impl GraphViewParams {
    fn entity_id(&self) -> Option<String> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        present(&self.id).or_else(|| present(&self.user_id).map(|user| actor_entity_id(&user)))
    }
}

/// Nodes and edges directly connected to one entity.
pub async fn graph_view(
    State(state): State<AppState>,
    Query(params): Query<GraphViewParams>,
) -> ApiResult<Json<ViewGraph>> {
    let id = params
        .entity_id()
        .ok_or_else(|| ApiError::unprocessable("either id or user_id is required"))?;

    let view = kgraph_graph::neighborhood(&state.graph, &id).await?;
    Ok(Json(view))
}
