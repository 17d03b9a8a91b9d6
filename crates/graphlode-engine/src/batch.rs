//! Commit cadence control.

use tracing::debug;

use graphlode_store::{GraphStore, StoreError};

/// Counts mutations and commits on batch boundaries.
///
/// A batch size of zero disables intermediate commits; `flush` still
/// commits at the end of the run. Commit failures propagate untouched,
/// there is no retry.
#[derive(Debug)]
pub struct BatchController {
    batch_size: usize,
    pending: usize,
    commits: u64,
}

impl BatchController {
    /// Create a controller and open the first batch on the store.
    pub fn start(batch_size: usize, store: &mut dyn GraphStore) -> Result<Self, StoreError> {
        store.start_batch()?;
        Ok(Self {
            batch_size,
            pending: 0,
            commits: 0,
        })
    }

    /// Count one mutation, committing if the batch is full.
    pub fn record_mutation(&mut self, store: &mut dyn GraphStore) -> Result<(), StoreError> {
        self.record_mutations(store, 1)
    }

    /// Count a block of mutations (bulk inserts), committing if the
    /// batch is full.
    pub fn record_mutations(
        &mut self,
        store: &mut dyn GraphStore,
        count: usize,
    ) -> Result<(), StoreError> {
        self.pending += count;
        if self.batch_size > 0 && self.pending >= self.batch_size {
            store.commit()?;
            store.start_batch()?;
            self.commits += 1;
            debug!(commits = self.commits, "batch committed");
            self.pending = 0;
        }
        Ok(())
    }

    /// Commit unconditionally and reset the counter.
    pub fn flush(&mut self, store: &mut dyn GraphStore) -> Result<(), StoreError> {
        store.commit()?;
        self.commits += 1;
        self.pending = 0;
        Ok(())
    }

    /// Number of commits issued so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }
}
