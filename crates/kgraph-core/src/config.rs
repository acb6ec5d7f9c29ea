//! Process configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables, so a deployment can run from env alone.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KgError, KgResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kgraph.toml";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub graph: GraphConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

/// Configuration for connecting to Neo4j.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            max_connections: 8,
            fetch_size: 200,
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

/// Which fact extractor and query translator to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorMode {
    /// Deterministic rule-based extraction, fallback translation only.
    #[default]
    Mock,
    /// Text-generation service, degrading to the mock path on failure.
    Llm,
}

impl FromStr for ExtractorMode {
    type Err = KgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "llm" => Ok(Self::Llm),
            other => Err(KgError::config(format!("unknown extractor mode '{}'", other))),
        }
    }
}

/// Text-generation service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub mode: ExtractorMode,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub extraction_timeout_secs: u64,
    pub translation_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Mock,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            temperature: 0.1,
            extraction_timeout_secs: 8,
            translation_timeout_secs: 8,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `kgraph.toml` when present), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> KgResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_str(&std::fs::read_to_string(DEFAULT_CONFIG_FILE)?)?
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> KgResult<Self> {
        toml::from_str(text).map_err(|e| KgError::config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> KgResult<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NEO4J_URI") {
            self.graph.uri = v;
        }
        if let Some(v) = get("NEO4J_USER") {
            self.graph.user = v;
        }
        if let Some(v) = get("NEO4J_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = get("NEO4J_DATABASE") {
            self.graph.database = v;
        }
        if let Some(v) = get("KG_EXTRACTOR_MODE") {
            self.llm.mode = v.parse()?;
        }
        if let Some(v) = get("OLLAMA_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("KG_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("KG_EXTRACTION_TIMEOUT_SECS") {
            self.llm.extraction_timeout_secs = parse_number("KG_EXTRACTION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("KG_TRANSLATION_TIMEOUT_SECS") {
            self.llm.translation_timeout_secs = parse_number("KG_TRANSLATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("KGRAPH_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("KGRAPH_PORT") {
            self.server.port = parse_number("KGRAPH_PORT", &v)?;
        }
        Ok(())
    }

    /// Fail fast on settings the store connection cannot work without.
    pub fn validate(&self) -> KgResult<()> {
        let missing: Vec<&str> = [
            ("NEO4J_URI", &self.graph.uri),
            ("NEO4J_USER", &self.graph.user),
            ("NEO4J_PASSWORD", &self.graph.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Err(KgError::config(format!(
                "Neo4j settings missing: check {}",
                missing.join("/")
            )));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> KgResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| KgError::config(format!("{} must be a number, got '{}'", key, value)))
}
