//! CLI command implementations.

pub mod export;
pub mod import;
pub mod normalize;
pub mod stats;

use anyhow::{Context, Result};
use graphlode_model::{Partition, Topology, TopologyFile};
use graphlode_store::SqliteStore;

use crate::GlobalOptions;

/// Open (or create) the graph database named by the global options.
pub fn open_store(global: &GlobalOptions) -> Result<SqliteStore> {
    SqliteStore::open(&global.store)
        .with_context(|| format!("failed to open store at {}", global.store.display()))
}

/// Load and validate the topology, merging in the partition flags.
pub fn load_topology(global: &GlobalOptions) -> Result<Topology> {
    let path = global
        .topology
        .as_ref()
        .context("this command requires --topology")?;
    let file = TopologyFile::load(path)
        .with_context(|| format!("failed to load topology from {}", path.display()))?;
    let partition = global.partition.as_ref().map(|value| Partition {
        key: global.partition_key.clone(),
        value: value.clone(),
    });
    file.into_topology(partition)
        .context("topology validation failed")
}
