//! Fact file ingest command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kgraph_core::{IngestBatch, Settings};

#[derive(Args)]
pub struct IngestArgs {
    /// JSON file holding an ingest batch
    pub file: PathBuf,
}

pub async fn execute(args: IngestArgs, settings: &Settings) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let batch: IngestBatch = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid ingest batch", args.file.display()))?;

    let client = super::connect(settings).await?;
    let summary = kgraph_graph::ingest(&client, &batch).await?;
    client.close().await;

    println!("{}", "Ingest complete:".green().bold());
    println!("  Entities: {}", summary.entities.to_string().cyan());
    println!("  Triples:  {}", summary.relationships.to_string().cyan());

    Ok(())
}
