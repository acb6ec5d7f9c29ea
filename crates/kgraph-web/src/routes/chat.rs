//! Chat handler: learn from a message, then answer it from the graph.
//!
//! Every collaborator and store step here is best-effort. Extraction and
//! translation are time-bounded with deterministic fallbacks, the upsert
//! failing only loses the new facts, and an unreachable store yields an
//! answer saying so.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{info, warn};
use uuid::Uuid;

use kgraph_core::fact::{normalize_batch, stamp_provenance};
use kgraph_core::{sanitize, IngestBatch, Record};
use kgraph_graph::QueryOutcome;
use kgraph_llm::{or_fallback, HeuristicExtractor, FALLBACK_QUERY};

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_USER: &str = "demo-user";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub cypher_used: String,
    pub graph_results: Vec<Record>,
    pub kg_delta: IngestBatch,
    pub source_id: String,
}

pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<AskResponse>> {
    let Json(request) = body?;
    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_USER)
        .to_string();
    let text = request.text;
    let source_id = format!("msg:{}", Uuid::new_v4());

    let kg_delta = learn(&state, &user_id, &text, &source_id).await;

    let translated = or_fallback(
        state.translation_timeout(),
        "translation",
        state.translator.translate(&text),
        || FALLBACK_QUERY.to_string(),
    )
    .await;

    let (cypher_used, outcome) = match sanitize(&translated) {
        Ok(safe) => {
            let outcome = match kgraph_graph::run_sanitized(&state.graph, &safe, Map::new()).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "Graph unavailable while answering");
                    QueryOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            (safe.into_string(), outcome)
        }
        Err(rejection) => (
            String::new(),
            QueryOutcome::Blocked {
                note: rejection.note(),
            },
        ),
    };

    info!(
        %source_id,
        facts = kg_delta.entities.len() + kg_delta.relationships.len(),
        %cypher_used,
        "Chat message handled"
    );

    let answer = compose_answer(&outcome);
    let graph_results = match outcome {
        QueryOutcome::Rows { rows } => rows,
        _ => Vec::new(),
    };

    Ok(Json(AskResponse {
        answer,
        cypher_used,
        graph_results,
        kg_delta,
        source_id,
    }))
}

/// Extract facts from the message and store them. Returns what was learned.
async fn learn(state: &AppState, user_id: &str, text: &str, source_id: &str) -> IngestBatch {
    let extracted = or_fallback(
        state.extraction_timeout(),
        "extraction",
        state.extractor.extract(user_id, text, source_id),
        || HeuristicExtractor.extract_now(user_id, text, source_id),
    )
    .await;

    let mut batch = match normalize_batch(&extracted) {
        Ok(batch) => batch,
        Err(err) => {
            warn!(error = %err, "Discarding invalid extracted facts");
            return IngestBatch::default();
        }
    };
    stamp_provenance(&mut batch, source_id, Utc::now());

    if !batch.is_empty() {
        if let Err(err) = kgraph_graph::upsert_batch(&state.graph, &batch).await {
            warn!(error = %err, "Could not store extracted facts");
        }
    }
    batch
}

fn compose_answer(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows { rows } if rows.is_empty() => {
            "I couldn't find anything in the graph for that.".to_string()
        }
        QueryOutcome::Rows { rows } => format!("Found {} result(s) in the graph.", rows.len()),
        QueryOutcome::Blocked { note } => note.clone(),
        QueryOutcome::Failed { error } => format!("The graph query failed: {}", error),
    }
}
