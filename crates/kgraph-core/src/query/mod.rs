//! Read-only query sanitization.
//!
//! Reduces an arbitrary query string (typed by a person or produced by a
//! model) to a single statement whose leading keyword is not a write.
//!
//! This is a prefix check, not a parser. It does not catch a mutating
//! procedure behind `CALL`, a write clause after a leading `MATCH`, or a
//! `;` inside a string literal.

use std::fmt;

use serde::Serialize;

/// Leading keywords that mutate data or schema.
pub const WRITE_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "LOAD", "USING", "FOREACH",
    "INSERT", "START", "STOP", "TERMINATE", "GRANT", "REVOKE", "DENY", "ALTER", "RENAME",
    "ENABLE", "DEALLOCATE", "REALLOCATE",
];

/// A single statement that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeQuery(String);

impl SafeQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a query was not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after stripping fences, whitespace and separators.
    Empty,
    /// The retained statement starts with a write keyword.
    Blocked { keyword: &'static str },
}

impl Rejection {
    /// Explanation returned to callers alongside an empty result.
    pub fn note(&self) -> String {
        match self {
            Rejection::Empty => "Query was empty.".to_string(),
            Rejection::Blocked { keyword } => {
                format!("Query was blocked: {} is a write operation and writes are not allowed here.", keyword)
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("empty query"),
            Rejection::Blocked { keyword } => write!(f, "write keyword {}", keyword),
        }
    }
}

/// Sanitize `raw` into a single read-only statement.
///
/// Steps: strip one fenced-code wrapper, keep the first non-empty statement,
/// reject it if it leads with a write keyword.
pub fn sanitize(raw: &str) -> Result<SafeQuery, Rejection> {
    let unfenced = strip_fences(raw.trim());

    let statement = unfenced
        .split(';')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .ok_or(Rejection::Empty)?;

    if let Some(keyword) = leading_write_keyword(statement) {
        return Err(Rejection::Blocked { keyword });
    }

    Ok(SafeQuery(statement.to_string()))
}

/// Remove a leading ```` ```lang ```` and a trailing ```` ``` ````.
pub fn strip_fences(s: &str) -> &str {
    let mut out = s.trim();
    if let Some(rest) = out.strip_prefix("```") {
        out = strip_fence_tag(rest);
    }
    if let Some(rest) = out.trim_end().strip_suffix("```") {
        out = rest;
    }
    out.trim()
}

/// Language tags a model may put after an opening fence.
const FENCE_TAGS: &[&str] = &["cypher", "cql", "neo4j", "sql", "text", "plaintext"];

fn strip_fence_tag(rest: &str) -> &str {
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
        .unwrap_or(rest.len());
    let (tag, after) = rest.split_at(tag_len);

    if FENCE_TAGS.iter().any(|known| known.eq_ignore_ascii_case(tag)) {
        after
    } else {
        rest
    }
}

fn leading_write_keyword(statement: &str) -> Option<&'static str> {
    let body = skip_leading_comments(statement);
    let first = body
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");

    WRITE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| keyword.eq_ignore_ascii_case(first))
}

fn skip_leading_comments(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("//") {
            s = rest.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(rest) = s.strip_prefix("/*") {
            s = rest.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return s;
        }
    }
}
