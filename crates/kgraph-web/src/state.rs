//! Application state.

use std::sync::Arc;
use std::time::Duration;

use kgraph_core::Settings;
use kgraph_graph::GraphClient;
use kgraph_llm::{extractor_for, translator_for, FactExtractor, QueryTranslator};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub graph: GraphClient,
    pub extractor: Arc<dyn FactExtractor>,
    pub translator: Arc<dyn QueryTranslator>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State with the collaborators selected by `settings.llm.mode`.
    pub fn new(graph: GraphClient, settings: Settings) -> Self {
        let extractor = extractor_for(&settings.llm);
        let translator = translator_for(&settings.llm);
        Self::with_collaborators(graph, extractor, translator, settings)
    }

    pub fn with_collaborators(
        graph: GraphClient,
        extractor: Arc<dyn FactExtractor>,
        translator: Arc<dyn QueryTranslator>,
        settings: Settings,
    ) -> Self {
        Self {
            graph,
            extractor,
            translator,
            settings: Arc::new(settings),
        }
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.llm.extraction_timeout_secs)
    }

    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.llm.translation_timeout_secs)
    }
}
