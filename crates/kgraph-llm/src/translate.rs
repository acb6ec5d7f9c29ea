//! Natural-language question to graph query translation.
//!
//! Translators only produce text. Whatever they return still goes through
//! the read-only sanitizer before it reaches the store.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use kgraph_core::query::strip_fences;
use kgraph_core::{NodeLabel, RelType};

use crate::ollama::OllamaClient;

/// Query used whenever no better translation is available.
pub const FALLBACK_QUERY: &str = "MATCH (n) RETURN n LIMIT 5";

#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<String>;
}

/// Always answers with [`FALLBACK_QUERY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTranslator;

#[async_trait]
impl QueryTranslator for FallbackTranslator {
    async fn translate(&self, _question: &str) -> Result<String> {
        Ok(FALLBACK_QUERY.to_string())
    }
}

/// Translator backed by a chat model.
#[derive(Clone)]
pub struct LlmTranslator {
    client: OllamaClient,
    prompt: String,
}

impl LlmTranslator {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            prompt: schema_prompt(),
        }
    }
}

#[async_trait]
impl QueryTranslator for LlmTranslator {
    async fn translate(&self, question: &str) -> Result<String> {
        let reply = self.client.chat(&self.prompt, question).await?;
        let query = clean_reply(&reply);
        debug!(%query, "Question translated");
        Ok(query)
    }
}

/// Strip fences and fall back when nothing is left.
pub fn clean_reply(reply: &str) -> String {
    match strip_fences(reply) {
        "" => FALLBACK_QUERY.to_string(),
        query => query.to_string(),
    }
}

/// System prompt describing the graph schema.
pub fn schema_prompt() -> String {
    let labels: Vec<String> = NodeLabel::ALL
        .iter()
        .map(|label| format!("- {}(id, name)", label))
        .collect();
    let rels: Vec<String> = RelType::ALL
        .iter()
        .map(|rel| {
            let (from, to) = rel.signature();
            format!("- {}({} -> {})", rel, from, to)
        })
        .collect();

    format!(
        "You translate user questions into a SINGLE Cypher statement against this schema.\n\n\
         Every node also has the label Entity and a unique `id` property.\n\n\
         Node labels:\n{labels}\n\n\
         Relationships:\n{rels}\n\n\
         Rules:\n\
         - Output ONLY Cypher. No prose, no markdown fences.\n\
         - Never write to the graph.\n\
         - Prefer matching by `id` when available (e.g. 'user:alice'); otherwise match by `name`.\n\
         - Add a reasonable LIMIT unless the question requires all results.",
        labels = labels.join("\n"),
        rels = rels.join("\n"),
    )
}
