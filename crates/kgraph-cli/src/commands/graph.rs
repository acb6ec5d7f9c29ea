//! Knowledge Graph CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::{Map, Value};

use kgraph_core::Settings;
use kgraph_graph::{GraphClient, QueryOutcome};

use crate::output;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Show graph status
    Status,

    /// Execute a read-only Cypher query
    Query {
        /// Cypher query string
        query: String,
        /// Query parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Show the direct neighborhood of an entity
    Neighbors {
        /// External entity id, e.g. user:alice
        id: String,
    },

    /// Create constraints and indexes
    Schema,
}

pub async fn execute(cmd: GraphCommands, settings: &Settings) -> Result<()> {
    let client = super::connect(settings).await?;

    let result = match cmd {
        GraphCommands::Status => cmd_status(&client, settings).await,
        GraphCommands::Query { query, params } => cmd_query(&client, &query, params.as_deref()).await,
        GraphCommands::Neighbors { id } => cmd_neighbors(&client, &id).await,
        GraphCommands::Schema => cmd_schema(&client).await,
    };

    client.close().await;
    result
}

/// Show graph status (node/relationship counts).
async fn cmd_status(client: &GraphClient, settings: &Settings) -> Result<()> {
    let counts = client.get_counts().await?;
    output::print_status(&settings.graph.uri, &settings.graph.database, &counts);
    Ok(())
}

/// Execute a sanitized Cypher query.
async fn cmd_query(client: &GraphClient, cypher: &str, params: Option<&str>) -> Result<()> {
    let params: Map<String, Value> = match params {
        Some(text) => serde_json::from_str(text).context("--params must be a JSON object")?,
        None => Map::new(),
    };

    match kgraph_graph::run_read_only(client, cypher, params).await? {
        QueryOutcome::Rows { rows } => output::print_rows(&rows),
        QueryOutcome::Blocked { note } => println!("{}", note.yellow()),
        QueryOutcome::Failed { error } => println!("{} {}", "Query failed:".red().bold(), error),
    }
    Ok(())
}

/// Explore the neighborhood of an entity.
async fn cmd_neighbors(client: &GraphClient, id: &str) -> Result<()> {
    println!("{} {}", "Neighborhood of".bold(), id.yellow());
    println!("{}", "─".repeat(50));

    let view = kgraph_graph::neighborhood(client, id).await?;
    output::print_view_graph(&view);
    Ok(())
}

async fn cmd_schema(client: &GraphClient) -> Result<()> {
    kgraph_graph::initialize_schema(client).await?;
    println!("{}", "Schema initialized.".green().bold());
    Ok(())
}
