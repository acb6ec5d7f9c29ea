//! Cypher seed scripts.
//!
//! Admin path for loading constraints and fixture data from `.cypher`
//! files. Statements run as written, writes included.

use std::path::Path;

use tracing::{debug, info};

use kgraph_core::KgResult;

use crate::client::GraphClient;
use crate::statement::Statement;

/// Split a script into statements.
///
/// Lines are trimmed; blank lines and `//` or `#` comment lines are skipped.
/// A statement ends at a line ending in `;` and its lines are joined with a
/// space. Text after the last `;` still counts as a statement.
pub fn split_script(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        buffer.push(line);
        if line.ends_with(';') {
            push_statement(&mut statements, &buffer);
            buffer.clear();
        }
    }
    push_statement(&mut statements, &buffer);

    statements
}

fn push_statement(statements: &mut Vec<String>, lines: &[&str]) {
    let joined = lines.join(" ");
    let statement = joined.trim_end_matches(';').trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

/// Run every statement of a script in order, each in its own transaction.
/// Returns how many statements ran.
pub async fn run_script(client: &GraphClient, text: &str) -> KgResult<usize> {
    let statements = split_script(text);
    for statement in &statements {
        debug!(statement = %preview(statement), "Running seed statement");
        client.execute_write(&[Statement::new(statement.as_str())]).await?;
    }
    Ok(statements.len())
}

/// Read and run a script file.
pub async fn run_file(client: &GraphClient, path: &Path) -> KgResult<usize> {
    let text = tokio::fs::read_to_string(path).await?;
    let count = run_script(client, &text).await?;
    info!(path = %path.display(), statements = count, "Seed script applied");
    Ok(count)
}

fn preview(statement: &str) -> String {
    const MAX: usize = 100;
    match statement.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &statement[..cut]),
        None => statement.to_string(),
    }
}
