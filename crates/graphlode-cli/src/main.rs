//! Graphlode CLI - Bulk graph import and export
//!
//! # Usage
//!
//! ```bash
//! # Load a JSON Lines node stream into a SQLite graph
//! graphlode -s graph.db -t topology.toml import nodes.jsonl
//!
//! # Complete hierarchies and assign the root object
//! graphlode -s graph.db -t topology.toml normalize
//!
//! # Export the graph back out as JSON Lines
//! graphlode -s graph.db -t topology.toml export -o nodes.out.jsonl
//!
//! # Per-label counts
//! graphlode -s graph.db stats
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// Graphlode - bulk import/export for property graph stores
#[derive(Parser, Debug)]
#[command(name = "graphlode")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to the SQLite graph database
    #[arg(
        long,
        short = 's',
        global = true,
        env = "GRAPHLODE_STORE",
        default_value = "graph.db"
    )]
    store: PathBuf,

    /// Path to the topology file (TOML)
    #[arg(long, short = 't', global = true, env = "GRAPHLODE_TOPOLOGY")]
    topology: Option<PathBuf>,

    /// Partition value for this run (uids and properties are scoped
    /// to it)
    #[arg(long, global = true)]
    partition: Option<String>,

    /// Property key the partition value is stored under
    #[arg(long, global = true, default_value = "_partition")]
    partition_key: String,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a JSON Lines node stream into the graph
    Import(commands::import::ImportArgs),

    /// Export the graph back out as JSON Lines node records
    Export(commands::export::ExportArgs),

    /// Complete hierarchies and assign the root object
    Normalize(commands::normalize::NormalizeArgs),

    /// Show vertex and edge counts
    Stats(commands::stats::StatsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Import(args) => commands::import::execute(args, cli.global),
        Commands::Export(args) => commands::export::execute(args, cli.global),
        Commands::Normalize(args) => commands::normalize::execute(args, cli.global),
        Commands::Stats(args) => commands::stats::execute(args, cli.global),
    }
}
