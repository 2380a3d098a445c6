//! Error types for task and resource mutations.

use relief_grid_core::{ResourceId, Role, TaskId};
use relief_grid_store::{StoreError, TaskStatus};
use thiserror::Error;

/// A result type using `LedgerError`.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors produced by the task ledger and the resource counter.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The requester's role does not permit the attempted action.
    #[error("role {role} is not permitted to {action}")]
    Unauthorized {
        /// The requester's role.
        role: Role,
        /// What was attempted.
        action: &'static str,
    },

    /// The requested status change violates the task state machine.
    #[error("invalid transition for task {task_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The task being advanced.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The requested availability violates `0 <= availability <= capacity`.
    #[error("requested availability {requested} is outside 0..={capacity}")]
    OutOfRange {
        /// The requested value, as submitted.
        requested: i64,
        /// The resource's capacity.
        capacity: u32,
    },

    /// No task with the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// No resource with the given id.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// The durable store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
