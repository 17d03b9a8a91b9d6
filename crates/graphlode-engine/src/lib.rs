//! Graphlode Engine - Bulk import/export for property graph stores
//!
//! Loads streams of linked node records into a [`GraphStore`] under
//! bounded memory and exports them back. The pipeline:
//!
//! 1. Accumulation ([`NodeAccumulator`]): nodes stream in, references
//!    may point forward; one of three strategies buffers just enough to
//!    resolve them at [`NodeAccumulator::finish`]. Selection is driven
//!    by the store's capability flags (or pinned via [`Strategy`]).
//! 2. Normalization ([`NormalizationEngine`]): idempotent hierarchy
//!    completion and root-object assignment.
//! 3. Export ([`ExportPipeline`]): vertices back out as node records,
//!    embedded children inlined, unknown properties restored.
//!
//! [`GraphStore`]: graphlode_store::GraphStore

mod accumulator;
mod batch;
mod columnar;
mod context;
mod error;
mod export;
mod generic;
mod native;
mod normalize;
mod resolver;

pub use accumulator::{accumulator_for, import_nodes, NodeAccumulator, PendingEdge};
pub use batch::BatchController;
pub use columnar::ColumnarBulkAccumulator;
pub use context::{
    ImportContext, Strategy, DEFAULT_VERTEX_LABEL, PLACEHOLDER_LABEL, UID_SEPARATOR,
};
pub use error::{ExportError, ImportError};
pub use export::{ExportOptions, ExportPipeline};
pub use generic::GenericAccumulator;
pub use native::NativeGraphAccumulator;
pub use normalize::{NormalizationEngine, NormalizationReport};
pub use resolver::{BloomFilter, EdgeResolver, ResolverConfig};
