//! Web server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use kgraph_core::Settings;
use kgraph_web::state::AppState;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,
}

pub async fn execute(args: ServeArgs, mut settings: Settings) -> Result<()> {
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(host) = args.host {
        settings.server.host = host;
    }

    let graph = super::connect(&settings).await?;
    kgraph_graph::initialize_schema(&graph).await?;

    let base = format!("http://{}:{}", settings.server.host, settings.server.port);
    println!();
    println!("  {} {}", "kgraph".cyan().bold(), "Knowledge Graph API".bold());
    println!();
    println!("  {}     {}/kg/ingest", "Ingest".green(), base);
    println!("  {}      {}/graph/run", "Query".green(), base);
    println!("  {}       {}/chat/ask", "Chat".green(), base);
    println!("  {}     {}/health", "Health".green(), base);
    println!("  {}  {:?}", "Extractor".green(), settings.llm.mode);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let result = kgraph_web::run_server(AppState::new(graph.clone(), settings)).await;
    graph.close().await;
    result
}
