use thiserror::Error;

use crate::task::TaskId;

/// Why a task cannot be started or triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotRunnableReason {
    /// No action has been bound to the task.
    Unbound,
    /// The task is excluded from runs.
    Disabled,
}

impl std::fmt::Display for NotRunnableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => f.write_str("no action bound"),
            Self::Disabled => f.write_str("task disabled"),
        }
    }
}

/// Configuration errors of the task engine.
///
/// Every variant is returned synchronously before any state is touched, so a
/// caller receiving one can assume no status changed and no event was emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("a run is already active")]
    RunActive,

    #[error("unknown task id: {0}")]
    UnknownTask(TaskId),

    #[error("unknown task name: {0}")]
    UnknownTaskName(String),

    #[error("task {id} is not runnable: {reason}")]
    NotRunnable { id: TaskId, reason: NotRunnableReason },

    #[error("task {child} already has parent {parent}")]
    DuplicateSubTask { parent: TaskId, child: TaskId },

    #[error("sub-task nesting too deep: {parent} -> {child}")]
    NestingTooDeep { parent: TaskId, child: TaskId },

    #[error("execution queue references missing task {0}")]
    MissingQueueEntry(TaskId),
}

impl FlowError {
    /// Rejections caused by the caller's timing rather than the task itself.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::RunActive)
    }
}
