//! Statistics for tree operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SyncResult;

/// Tree operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeOperation {
    Upload,
    Download,
    Remove,
}

impl std::fmt::Display for TreeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeOperation::Upload => write!(f, "upload"),
            TreeOperation::Download => write!(f, "download"),
            TreeOperation::Remove => write!(f, "remove"),
        }
    }
}

/// Single leaf operations performed by a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafOperation {
    Upload,
    Download,
    Delete,
    CreateDirectory,
    RemoveDirectory,
}

impl std::fmt::Display for LeafOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafOperation::Upload => write!(f, "Upload"),
            LeafOperation::Download => write!(f, "Download"),
            LeafOperation::Delete => write!(f, "Delete"),
            LeafOperation::CreateDirectory => write!(f, "Create Directory"),
            LeafOperation::RemoveDirectory => write!(f, "Remove Directory"),
        }
    }
}

/// Counters collected while one tree operation runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStats {
    /// Unique identifier of the tree operation
    pub operation_id: Uuid,
    /// Which tree operation produced these stats
    pub operation: Option<TreeOperation>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files_uploaded: usize,
    pub files_downloaded: usize,
    pub files_deleted: usize,
    pub directories_created: usize,
    pub directories_removed: usize,
    /// Leaf operations the server refused
    pub failed: usize,
    /// Whether the whole tree completed
    pub completed: bool,
}

impl Default for TreeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStats {
    pub fn new() -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            operation: None,
            started_at: Utc::now(),
            finished_at: None,
            files_uploaded: 0,
            files_downloaded: 0,
            files_deleted: 0,
            directories_created: 0,
            directories_removed: 0,
            failed: 0,
            completed: false,
        }
    }

    /// Fresh stats for a tree operation that starts now
    pub fn start(operation: TreeOperation) -> Self {
        Self {
            operation: Some(operation),
            ..Self::new()
        }
    }

    /// Record a leaf operation and whether the server accepted it
    pub fn record(&mut self, operation: LeafOperation, ok: bool) {
        if !ok {
            self.failed += 1;
            debug!(operation = %operation, "Leaf operation refused");
            return;
        }

        match operation {
            LeafOperation::Upload => self.files_uploaded += 1,
            LeafOperation::Download => self.files_downloaded += 1,
            LeafOperation::Delete => self.files_deleted += 1,
            LeafOperation::CreateDirectory => self.directories_created += 1,
            LeafOperation::RemoveDirectory => self.directories_removed += 1,
        }
    }

    /// Mark the tree operation as finished
    pub fn complete(&mut self, completed: bool) {
        self.finished_at = Some(Utc::now());
        self.completed = completed;

        info!(
            operation_id = %self.operation_id,
            operation = ?self.operation,
            duration_ms = self.duration_ms(),
            files_uploaded = self.files_uploaded,
            files_downloaded = self.files_downloaded,
            files_deleted = self.files_deleted,
            directories_created = self.directories_created,
            directories_removed = self.directories_removed,
            failed = self.failed,
            completed,
            "Tree operation finished"
        );
    }

    /// Elapsed time in milliseconds, zero while still running
    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0)
    }

    /// Total leaf operations the server accepted
    pub fn succeeded(&self) -> usize {
        self.files_uploaded
            + self.files_downloaded
            + self.files_deleted
            + self.directories_created
            + self.directories_removed
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let operation = self
            .operation
            .map(|op| op.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{} {}: {} uploaded, {} downloaded, {} deleted, {} dirs created, {} dirs removed, {} failed in {}ms",
            operation,
            if self.completed { "completed" } else { "incomplete" },
            self.files_uploaded,
            self.files_downloaded,
            self.files_deleted,
            self.directories_created,
            self.directories_removed,
            self.failed,
            self.duration_ms()
        )
    }
}
