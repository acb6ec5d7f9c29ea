//! Ad-hoc read-only query handler.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use kgraph_graph::QueryOutcome;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RunQueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Run a read-only query.
///
/// Blocked and refused queries still answer 200 with empty `rows` and a
/// `note` or `error` explaining why.
pub async fn run_query(
    State(state): State<AppState>,
    body: Result<Json<RunQueryRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let outcome = kgraph_graph::run_read_only(
        &state.graph,
        &request.query,
        request.params.unwrap_or_default(),
    )
    .await?;

    Ok(Json(outcome_body(outcome)))
}

fn outcome_body(outcome: QueryOutcome) -> Value {
    match outcome {
        QueryOutcome::Rows { rows } => json!({ "rows": rows }),
        QueryOutcome::Blocked { note } => json!({ "rows": [], "note": note }),
        QueryOutcome::Failed { error } => json!({ "rows": [], "error": error }),
    }
}
