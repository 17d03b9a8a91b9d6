//! Export command - write the graph back out as JSON Lines.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use graphlode_engine::{ExportOptions, ExportPipeline, ImportContext};

use super::{load_topology, open_store};
use crate::GlobalOptions;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Also export implicit vertices and edges created during
    /// normalization
    #[arg(long)]
    include_implicit: bool,
}

pub fn execute(args: ExportArgs, global: GlobalOptions) -> Result<()> {
    let topology = load_topology(&global)?;
    let store = open_store(&global)?;
    let ctx = ImportContext::new(topology);

    let nodes = ExportPipeline::new(&store, &ctx)
        .with_options(ExportOptions {
            include_implicit: args.include_implicit,
        })
        .export()?;

    let count = nodes.len();
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    };
    for node in nodes {
        serde_json::to_writer(&mut writer, &node)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    if !global.quiet {
        if let Some(path) = &args.output {
            eprintln!("Exported {count} nodes to {}", path.display());
        }
    }
    Ok(())
}
