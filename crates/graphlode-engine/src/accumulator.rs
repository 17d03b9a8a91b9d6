//! Accumulation strategy selection.
//!
//! References may arrive before their target node, so every strategy
//! buffers something: the generic one a full id map, the columnar one
//! pending edges plus Bloom filters, the native one placeholder
//! vertices in the store itself. The factory picks from the store's
//! capability flags unless the context pins a strategy explicitly.

use tracing::info;

use graphlode_model::Node;
use graphlode_store::GraphStore;

use crate::columnar::ColumnarBulkAccumulator;
use crate::context::{ImportContext, Strategy};
use crate::error::ImportError;
use crate::generic::GenericAccumulator;
use crate::native::NativeGraphAccumulator;

/// An edge recorded during accumulation and created during finish.
/// Consumed exactly once, then discarded.
#[derive(Debug, Clone)]
pub struct PendingEdge {
    pub edge_label: String,
    pub source_label: String,
    /// Composed endpoint uids (join/lookup keys).
    pub source_uid: String,
    pub target_uid: String,
    /// Raw endpoint identifiers (error context only).
    pub source_id: String,
    pub target_id: String,
}

/// One import run's sink for node records.
///
/// `finish` is single use; calling it twice, or calling `add_node`
/// after it, is an [`ImportError::AlreadyFinished`].
pub trait NodeAccumulator {
    fn add_node(&mut self, node: Node) -> Result<(), ImportError>;

    /// Resolve buffered references, create remaining edges, and commit.
    fn finish(&mut self) -> Result<(), ImportError>;
}

/// Pick the accumulation strategy for a store.
pub fn accumulator_for<'a>(
    store: &'a mut dyn GraphStore,
    ctx: &'a ImportContext,
) -> Result<Box<dyn NodeAccumulator + 'a>, ImportError> {
    let capabilities = store.capabilities();
    let strategy = match ctx.strategy() {
        Strategy::Auto => {
            if capabilities.bulk_columnar {
                Strategy::Columnar
            } else if capabilities.keyed_lookup {
                Strategy::Native
            } else {
                Strategy::Generic
            }
        }
        explicit => explicit,
    };
    info!(?strategy, "selected accumulation strategy");
    match strategy {
        Strategy::Columnar => Ok(Box::new(ColumnarBulkAccumulator::new(store, ctx)?)),
        Strategy::Native => Ok(Box::new(NativeGraphAccumulator::new(store, ctx)?)),
        Strategy::Generic | Strategy::Auto => Ok(Box::new(GenericAccumulator::new(store, ctx)?)),
    }
}

/// Import a batch of nodes end to end.
///
/// Input is sorted into type groups first (untyped last) so the
/// columnar strategy sees each type exactly once; the other strategies
/// are order-insensitive. Returns the number of input nodes consumed.
pub fn import_nodes(
    store: &mut dyn GraphStore,
    ctx: &ImportContext,
    mut nodes: Vec<Node>,
) -> Result<usize, ImportError> {
    nodes.sort_by(|l, r| l.type_order().cmp(&r.type_order()));
    let count = nodes.len();
    let mut accumulator = accumulator_for(store, ctx)?;
    for node in nodes {
        accumulator.add_node(node)?;
    }
    accumulator.finish()?;
    Ok(count)
}
