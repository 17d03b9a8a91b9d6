//! Engine error types.

use thiserror::Error;

use graphlode_store::StoreError;

/// Errors raised during node accumulation and import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A reference targets an identifier that never arrived. Fatal for
    /// the run; carries full context for the report.
    #[error("unresolved reference '{edge_label}' from '{source_id}' to '{target_id}'")]
    DanglingReference {
        source_id: String,
        edge_label: String,
        target_id: String,
    },

    /// `finish` was called twice, or `add_node` after `finish`
    #[error("accumulator already finished")]
    AlreadyFinished,

    /// Backend failure, propagated without retry
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Shorthand used by the accumulators.
    pub fn dangling(
        source_id: impl Into<String>,
        edge_label: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        ImportError::DanglingReference {
            source_id: source_id.into(),
            edge_label: edge_label.into(),
            target_id: target_id.into(),
        }
    }
}

/// Errors raised while exporting nodes back out of a store.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
