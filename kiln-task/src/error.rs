use core::fmt;

use crate::task::TaskId;

/// Unified error type for kiln-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// No task was ever created with this id
    NoSuchTask(TaskId),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::NoSuchTask(id) => write!(f, "no such task: {}", id),
        }
    }
}

impl core::error::Error for TaskError {}

/// Convenience Result type alias.
pub type Result<T> = ::core::result::Result<T, TaskError>;
