//! Ad-hoc read-only queries.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use kgraph_core::{sanitize, KgError, KgResult, Record, SafeQuery};

use crate::client::GraphClient;
use crate::statement::Statement;

/// Result of an ad-hoc query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    /// The statement ran.
    Rows { rows: Vec<Record> },
    /// Nothing ran: the query was empty or led with a write.
    Blocked { note: String },
    /// The store refused the statement.
    Failed { error: String },
}

impl QueryOutcome {
    /// Rows returned, empty unless the statement ran.
    pub fn rows(&self) -> &[Record] {
        match self {
            QueryOutcome::Rows { rows } => rows,
            _ => &[],
        }
    }
}

/// Sanitize `raw` and run it with `params`.
///
/// Blocked or refused queries are reported in the outcome; only a store
/// that cannot be reached is an error.
pub async fn run_read_only(
    client: &GraphClient,
    raw: &str,
    params: Map<String, Value>,
) -> KgResult<QueryOutcome> {
    let safe = match sanitize(raw) {
        Ok(safe) => safe,
        Err(rejection) => {
            let note = rejection.note();
            info!(reason = %KgError::QueryRejected(rejection), "Ad-hoc query not run");
            return Ok(QueryOutcome::Blocked { note });
        }
    };

    run_sanitized(client, &safe, params).await
}

/// Run a query that already passed [`sanitize`].
pub async fn run_sanitized(
    client: &GraphClient,
    query: &SafeQuery,
    params: Map<String, Value>,
) -> KgResult<QueryOutcome> {
    let statement = Statement::new(query.as_str()).with_params(params);
    match client.execute(&statement).await {
        Ok(rows) => {
            debug!(rows = rows.len(), "Ad-hoc query returned");
            Ok(QueryOutcome::Rows { rows })
        }
        Err(err @ KgError::Query { .. }) => Ok(QueryOutcome::Failed {
            error: err.to_string(),
        }),
        Err(err) => Err(err),
    }
}
