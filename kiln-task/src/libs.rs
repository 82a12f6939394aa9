#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod error;
pub mod manager;
pub mod scheduler;
pub mod task;
pub mod timer;

#[cfg(test)]
mod tests;

// Re-exports
pub use arch::Arch;
pub use config::SchedulerConfig;
pub use error::{Result, TaskError};
pub use manager::{Switch, TaskManager};
pub use scheduler::{Scheduler, TaskRef};
pub use task::{Context, Task, TaskFn, TaskId, Trampoline};
pub use timer::{TASK_TIMER_VALUE, Timer, TimerManager};
