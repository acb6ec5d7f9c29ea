//! Terminal output formatting.

use colored::{ColoredString, Colorize};

use kgraph_core::{Record, ViewGraph};
use kgraph_graph::GraphCounts;

/// Print store location and totals.
pub fn print_status(uri: &str, database: &str, counts: &GraphCounts) {
    println!("{}", "Knowledge Graph Status".bold());
    println!("{}", "─".repeat(40));
    println!("  Store:         {} ({})", uri.green(), database);
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!("{}", "─".repeat(40));
}

/// Print query rows, one JSON object per line.
pub fn print_rows(rows: &[Record]) {
    if rows.is_empty() {
        println!("{}", "No results.".dimmed());
        return;
    }
    for (i, row) in rows.iter().enumerate() {
        let line = serde_json::to_string(row).unwrap_or_else(|_| format!("{:?}", row));
        println!("{}: {}", (i + 1).to_string().dimmed(), line);
    }
}

/// Print a neighborhood view as nodes then edges.
pub fn print_view_graph(view: &ViewGraph) {
    if view.is_empty() {
        println!("{}", "Entity not found or has no relationships.".dimmed());
        return;
    }

    println!("{} ({}):", "Nodes".bold(), view.nodes.len());
    for node in &view.nodes {
        println!(
            "  {} [{}] {} {}",
            "•".dimmed(),
            label_colored(&node.label),
            node.title,
            format!("({})", node.id).dimmed()
        );
    }

    println!("\n{} ({}):", "Relationships".bold(), view.edges.len());
    for edge in &view.edges {
        println!(
            "  {} {} {} {}",
            edge.from.dimmed(),
            "-[".dimmed(),
            edge.label.yellow(),
            format!("]-> {}", edge.to).dimmed()
        );
    }
}

fn label_colored(label: &str) -> ColoredString {
    match label {
        "Person" => label.cyan(),
        "Place" => label.green(),
        "Org" => label.magenta(),
        "Goal" => label.yellow(),
        "Event" => label.blue(),
        _ => label.normal(),
    }
}
