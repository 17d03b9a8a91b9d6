//! Import command - load a JSON Lines node stream into the graph.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use graphlode_engine::{import_nodes, ImportContext, ResolverConfig, Strategy};
use graphlode_model::Node;

use super::{load_topology, open_store};
use crate::progress::progress_bar;
use crate::GlobalOptions;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Input file: one JSON node record per line
    input: PathBuf,

    /// Mutations per commit (0 commits only at the end)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Accumulation strategy (default: pick from store capabilities)
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    strategy: StrategyArg,

    /// Type expected to dominate the input; its membership filter is
    /// sized an order of magnitude larger
    #[arg(long)]
    dominant_type: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg {
    Auto,
    Generic,
    Columnar,
    Native,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::Generic => Strategy::Generic,
            StrategyArg::Columnar => Strategy::Columnar,
            StrategyArg::Native => Strategy::Native,
        }
    }
}

pub fn execute(args: ImportArgs, global: GlobalOptions) -> Result<()> {
    let topology = load_topology(&global)?;
    let nodes = read_nodes(&args.input, global.quiet)?;

    let mut ctx = ImportContext::new(topology).with_strategy(args.strategy.into());
    if let Some(batch_size) = args.batch_size {
        ctx = ctx.with_batch_size(batch_size);
    }
    if args.dominant_type.is_some() {
        ctx = ctx.with_resolver(ResolverConfig {
            dominant_label: args.dominant_type,
            ..ResolverConfig::default()
        });
    }

    let mut store = open_store(&global)?;
    let count = import_nodes(&mut store, &ctx, nodes)?;

    if !global.quiet {
        println!("Imported {count} nodes into {}", global.store.display());
    }
    Ok(())
}

/// Read a JSON Lines file of node records, skipping blank lines.
fn read_nodes(path: &PathBuf, quiet: bool) -> Result<Vec<Node>> {
    let file =
        File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);
    let bar = progress_bar(total, "reading", quiet);

    let mut nodes = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if let Some(bar) = &bar {
            bar.inc(line.len() as u64 + 1);
        }
        if line.trim().is_empty() {
            continue;
        }
        let node: Node = serde_json::from_str(&line)
            .with_context(|| format!("invalid node record on line {}", lineno + 1))?;
        nodes.push(node);
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(nodes)
}
