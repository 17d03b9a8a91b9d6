//! Stats command - vertex and edge counts.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use graphlode_store::GraphStore;

use super::open_store;
use crate::GlobalOptions;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Stats {
    vertices: usize,
    edges: usize,
    labels: Vec<LabelCount>,
}

#[derive(Debug, Serialize)]
struct LabelCount {
    label: String,
    vertices: usize,
}

pub fn execute(args: StatsArgs, global: GlobalOptions) -> Result<()> {
    let store = open_store(&global)?;

    let mut labels = Vec::new();
    for label in store.labels()? {
        let vertices = store.vertices_with_label(&label)?.len();
        labels.push(LabelCount { label, vertices });
    }
    let stats = Stats {
        vertices: store.vertex_count()?,
        edges: store.edge_count()?,
        labels,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Vertices: {}", stats.vertices);
        println!("Edges:    {}", stats.edges);
        for entry in &stats.labels {
            println!("  {:<24} {}", entry.label, entry.vertices);
        }
    }
    Ok(())
}
