//! Fact extraction from free text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use kgraph_core::query::strip_fences;
use kgraph_core::{Entity, IngestBatch, NodeLabel, RelType, Relationship};

use crate::ollama::OllamaClient;

/// Turns a statement by an actor into facts about that actor.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, actor_id: &str, text: &str, source_id: &str) -> Result<IngestBatch>;
}

/// External id of the person speaking.
pub fn actor_entity_id(actor_id: &str) -> String {
    format!("user:{}", actor_id.trim())
}

/// Deterministic rule-based extractor.
///
/// Always yields the actor as a `Person`, plus facts for a handful of
/// first-person phrasings. Never fails and never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

#[derive(Clone, Copy)]
enum Capture {
    /// Consecutive capitalized words ("New York").
    ProperName,
    /// Everything up to the end of the clause.
    Phrase,
}

struct Pattern {
    cue: &'static str,
    label: NodeLabel,
    pred: RelType,
    capture: Capture,
}

const PATTERNS: &[Pattern] = &[
    Pattern { cue: "i live in", label: NodeLabel::Place, pred: RelType::LivesIn, capture: Capture::ProperName },
    Pattern { cue: "i work at", label: NodeLabel::Org, pred: RelType::WorksAt, capture: Capture::ProperName },
    Pattern { cue: "i work for", label: NodeLabel::Org, pred: RelType::WorksAt, capture: Capture::ProperName },
    Pattern { cue: "my goal is to", label: NodeLabel::Goal, pred: RelType::HasGoal, capture: Capture::Phrase },
    Pattern { cue: "i met with", label: NodeLabel::Person, pred: RelType::MetWith, capture: Capture::ProperName },
    Pattern { cue: "i met", label: NodeLabel::Person, pred: RelType::MetWith, capture: Capture::ProperName },
    Pattern { cue: "my friend", label: NodeLabel::Person, pred: RelType::FriendOf, capture: Capture::ProperName },
];

const MAX_NAME_WORDS: usize = 4;
const MAX_PHRASE_WORDS: usize = 8;

impl HeuristicExtractor {
    /// Synchronous extraction, also used as the fallback for slower extractors.
    pub fn extract_now(&self, actor_id: &str, text: &str, source_id: &str) -> IngestBatch {
        let actor = actor_entity_id(actor_id);
        let mut batch = IngestBatch::default();
        batch
            .entities
            .push(Entity::new(actor.clone(), NodeLabel::Person).with_name(actor_id.trim()));

        // ASCII lowercasing keeps byte offsets aligned with `text`.
        let lower = text.to_ascii_lowercase();
        for pattern in PATTERNS {
            for (start, _) in lower.match_indices(pattern.cue) {
                let end = start + pattern.cue.len();
                if !is_word_start(&lower, start) || !lower[end..].starts_with(char::is_whitespace) {
                    continue;
                }
                let Some(name) = capture(&text[end..], pattern.capture) else {
                    continue;
                };

                let id = format!("{}:{}", id_prefix(pattern.label), slug(&name));
                if !batch.entities.iter().any(|e| e.id == id) {
                    batch.entities.push(Entity::new(id.clone(), pattern.label).with_name(name));
                }
                let rel = Relationship::new(actor.clone(), pattern.pred, id)
                    .with_prop("text", text)
                    .with_prop("source_id", source_id);
                if !batch.relationships.contains(&rel) {
                    batch.relationships.push(rel);
                }
            }
        }

        debug!(
            entities = batch.entities.len(),
            triples = batch.relationships.len(),
            "Heuristic extraction"
        );
        batch
    }
}

#[async_trait]
impl FactExtractor for HeuristicExtractor {
    async fn extract(&self, actor_id: &str, text: &str, source_id: &str) -> Result<IngestBatch> {
        Ok(self.extract_now(actor_id, text, source_id))
    }
}

fn is_word_start(lower: &str, start: usize) -> bool {
    lower[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

fn capture(rest: &str, mode: Capture) -> Option<String> {
    let words: Vec<&str> = match mode {
        Capture::ProperName => {
            let mut words = Vec::new();
            for raw in rest.split_whitespace().take(MAX_NAME_WORDS) {
                let word = raw.trim_end_matches(|c: char| !c.is_alphanumeric());
                if !word.starts_with(char::is_uppercase) {
                    break;
                }
                words.push(word);
                if word.len() != raw.len() {
                    break;
                }
            }
            words
        }
        Capture::Phrase => {
            let clause = rest
                .split(['.', ',', '!', '?', ';', '\n'])
                .next()
                .unwrap_or_default();
            clause.split_whitespace().take(MAX_PHRASE_WORDS).collect()
        }
    };

    let name = words.join(" ");
    (!name.is_empty()).then_some(name)
}

fn id_prefix(label: NodeLabel) -> &'static str {
    match label {
        NodeLabel::Person => "person",
        NodeLabel::Place => "place",
        NodeLabel::Org => "org",
        NodeLabel::Goal => "goal",
        NodeLabel::Event => "event",
        NodeLabel::Thing => "thing",
    }
}

/// Lowercase, alphanumerics kept, every other run collapsed to `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Extractor backed by a chat model answering in JSON.
#[derive(Clone)]
pub struct LlmExtractor {
    client: OllamaClient,
}

impl LlmExtractor {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FactExtractor for LlmExtractor {
    async fn extract(&self, actor_id: &str, text: &str, source_id: &str) -> Result<IngestBatch> {
        let reply = self
            .client
            .chat_json(&extraction_prompt(actor_id), text)
            .await?;
        parse_reply(&reply, actor_id, text, source_id)
    }
}

/// System prompt describing the fact vocabulary.
pub fn extraction_prompt(actor_id: &str) -> String {
    let labels: Vec<&str> = NodeLabel::ALL.iter().map(NodeLabel::as_str).collect();
    let rels: Vec<String> = RelType::ALL
        .iter()
        .map(|rel| {
            let (from, to) = rel.signature();
            format!("- {}({} -> {})", rel, from, to)
        })
        .collect();

    format!(
        "Extract facts about the speaker from their message.\n\
         The speaker's id is '{actor}'.\n\n\
         Answer with ONLY a JSON object:\n\
         {{\"entities\": [{{\"id\": \"...\", \"label\": \"...\", \"name\": \"...\"}}],\n \
         \"triples\": [{{\"subj\": \"...\", \"pred\": \"...\", \"obj\": \"...\"}}]}}\n\n\
         Entity labels: {labels}\n\
         Relationship types:\n{rels}\n\n\
         Rules:\n\
         - Use ids of the form '<kind>:<lowercase-name>', e.g. 'place:karachi'.\n\
         - Only use the labels and relationship types listed above.\n\
         - Return empty lists when the message states no facts.",
        actor = actor_entity_id(actor_id),
        labels = labels.join(", "),
        rels = rels.join("\n"),
    )
}

/// Parse a model reply into a batch about `actor_id`.
///
/// The actor entity is added when missing and every relationship carries
/// the message text and source id.
pub fn parse_reply(reply: &str, actor_id: &str, text: &str, source_id: &str) -> Result<IngestBatch> {
    let mut batch: IngestBatch = serde_json::from_str(strip_fences(reply))
        .context("Model reply is not a valid fact batch")?;

    let actor = actor_entity_id(actor_id);
    if !batch.entities.iter().any(|e| e.id.trim() == actor) {
        batch
            .entities
            .insert(0, Entity::new(actor, NodeLabel::Person).with_name(actor_id.trim()));
    }
    for rel in &mut batch.relationships {
        rel.props
            .entry("text")
            .or_insert_with(|| Value::String(text.to_string()));
        rel.props
            .entry("source_id")
            .or_insert_with(|| Value::String(source_id.to_string()));
    }
    Ok(batch)
}
