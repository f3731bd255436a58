//! Attempted/succeeded accounting for one directory level of a tree walk

use serde::{Deserialize, Serialize};

/// Completion state of one subtree.
///
/// Every entry visited bumps `attempted`; entries whose leaf operation (or
/// nested subtree) fully succeeded bump `succeeded`. The subtree is
/// complete when both counts agree, which includes the empty directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

impl TransferOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one entry, crediting it when `ok`
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn is_complete(&self) -> bool {
        self.attempted == self.succeeded
    }
}
