//! Seed script command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kgraph_core::Settings;

#[derive(Args)]
pub struct SeedArgs {
    /// Cypher script files, run in the order given
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub async fn execute(args: SeedArgs, settings: &Settings) -> Result<()> {
    let client = super::connect(settings).await?;

    for path in &args.files {
        println!("{} {}", "→ Reading".bold(), path.display());
        let count = kgraph_graph::run_file(&client, path)
            .await
            .with_context(|| format!("Seeding from {} failed", path.display()))?;
        println!("  {} statements applied", count.to_string().cyan());
    }

    client.close().await;
    println!("{}", "Done.".green().bold());
    Ok(())
}
