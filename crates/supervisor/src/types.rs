//! Data types for supervised transfers.

use std::path::PathBuf;

use nimbus_transfer::{UploadStrategy, UserAction};
use uuid::Uuid;

/// Lifecycle of one supervised task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Uploading,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// An upload job handed to the supervisor.
#[derive(Debug, Clone)]
pub struct UploadSpec {
    pub account_id: String,
    /// Destination folder: an item id, or `"root"` for the drive root.
    pub parent_id: String,
    pub file_name: String,
    pub content_type: String,
    pub path: PathBuf,
}

/// Snapshot of one task's state.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub task_id: Uuid,
    pub account_id: String,
    pub file_name: String,
    pub content_type: String,
    /// Payload size; 0 until the file has been inspected.
    pub total_bytes: u64,
    /// Chosen upload strategy; `None` until the file has been inspected.
    pub strategy: Option<UploadStrategy>,
    pub progress_percent: u8,
    pub state: TaskState,
}

/// Event emitted while tasks run.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Whole-payload progress update, 0..=100.
    Progress { task_id: Uuid, percent: u8 },
    /// The task reached a terminal state.
    Terminal {
        task_id: Uuid,
        state: TaskState,
        /// Human-readable failure description, `None` on success or
        /// cancellation.
        detail: Option<String>,
        /// What an observer should offer the user next.
        action: UserAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Uploading.is_terminal());
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
    }
}
