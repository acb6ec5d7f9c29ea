//! # kgraph LLM
//!
//! External text-generation collaborators: fact extraction from chat
//! messages and question-to-query translation, both served by Ollama, plus
//! deterministic fallbacks used in mock mode or when the model misbehaves.

pub mod deadline;
pub mod extract;
pub mod ollama;
pub mod translate;

use std::sync::Arc;

use kgraph_core::{ExtractorMode, LlmConfig};

pub use deadline::or_fallback;
pub use extract::{actor_entity_id, FactExtractor, HeuristicExtractor, LlmExtractor};
pub use ollama::OllamaClient;
pub use translate::{FallbackTranslator, LlmTranslator, QueryTranslator, FALLBACK_QUERY};

/// Fact extractor for the configured mode.
pub fn extractor_for(config: &LlmConfig) -> Arc<dyn FactExtractor> {
    match config.mode {
        ExtractorMode::Mock => Arc::new(HeuristicExtractor),
        ExtractorMode::Llm => Arc::new(LlmExtractor::new(OllamaClient::from_config(config))),
    }
}

/// Query translator for the configured mode.
pub fn translator_for(config: &LlmConfig) -> Arc<dyn QueryTranslator> {
    match config.mode {
        ExtractorMode::Mock => Arc::new(FallbackTranslator),
        ExtractorMode::Llm => Arc::new(LlmTranslator::new(OllamaClient::from_config(config))),
    }
}
