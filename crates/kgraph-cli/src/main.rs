//! kgraph CLI
//!
//! Runs the knowledge graph HTTP service and its admin commands.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::Cli;

const DEFAULT_FILTER: &str = "kgraph=info,kgraph_web=debug,kgraph_graph=info";

/// Initialize tracing with optional file logging.
///
/// The file layer writes without ANSI codes and appends to `log_file`.
fn init_tracing(log_file: Option<&Path>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let file_layer = log_file.map(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "kgraph.log".into());
        let _ = std::fs::create_dir_all(dir);

        tracing_subscriber::fmt::layer()
            .with_writer(tracing_appender::rolling::never(dir, name))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());
    cli.execute().await
}
