//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kgraph_core::Settings;
use kgraph_graph::GraphClient;

pub mod graph;
pub mod ingest;
pub mod seed;
pub mod serve;

/// How long startup waits for the store before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// kgraph - personal knowledge graph service
#[derive(Parser)]
#[command(name = "kgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./kgraph.toml when present)
    #[arg(short, long, global = true, env = "KGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve(serve::ServeArgs),

    /// Upsert facts from a JSON file ({"entities": [...], "triples": [...]})
    Ingest(ingest::IngestArgs),

    /// Run Cypher seed scripts against the store
    Seed(seed::SeedArgs),

    /// Knowledge Graph commands
    #[command(subcommand)]
    Graph(graph::GraphCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref()).context("Failed to load settings")?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, settings).await,
            Commands::Ingest(args) => ingest::execute(args, &settings).await,
            Commands::Seed(args) => seed::execute(args, &settings).await,
            Commands::Graph(cmd) => graph::execute(cmd, &settings).await,
        }
    }
}

/// Validate store settings and open a verified connection.
pub async fn connect(settings: &Settings) -> Result<GraphClient> {
    settings.validate()?;

    let client = tokio::time::timeout(CONNECT_TIMEOUT, GraphClient::connect(&settings.graph))
        .await
        .with_context(|| format!("Timed out connecting to Neo4j at {}", settings.graph.uri))?
        .with_context(|| format!("Could not connect to Neo4j at {}", settings.graph.uri))?;

    Ok(client)
}
