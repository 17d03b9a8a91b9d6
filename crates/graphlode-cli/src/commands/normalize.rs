//! Normalize command - hierarchy completion and root assignment.

use anyhow::Result;
use clap::Args;

use graphlode_engine::{ImportContext, NormalizationEngine};

use super::{load_topology, open_store};
use crate::progress::spinner;
use crate::GlobalOptions;

/// Arguments for the normalize command
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Mutations per commit (0 commits only at the end)
    #[arg(long)]
    batch_size: Option<usize>,
}

pub fn execute(args: NormalizeArgs, global: GlobalOptions) -> Result<()> {
    let topology = load_topology(&global)?;
    let mut ctx = ImportContext::new(topology);
    if let Some(batch_size) = args.batch_size {
        ctx = ctx.with_batch_size(batch_size);
    }
    let mut store = open_store(&global)?;

    let bar = spinner("normalizing", global.quiet);
    let report = NormalizationEngine::new(&mut store, &ctx)?.run()?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if !global.quiet {
        println!(
            "Normalized in {} pass(es): {} parent(s) created, {} parent edge(s) added{}",
            report.passes,
            report.created_parents,
            report.parent_edges,
            if report.root_assigned {
                ", root assigned"
            } else {
                ""
            }
        );
    }
    Ok(())
}
