//! The seam between the scheduler and the processor it runs on.
//!
//! Everything above this module is ordinary data structure code. The only
//! operations that touch raw machine state are the ones an [`Arch`] supplies:
//! masking the timer interrupt, swapping register state, and the trampoline a
//! freshly created task lands in.

pub mod x86_64;

use crate::task::Trampoline;

/// Saved register state of a task that is not currently running.
///
/// Only the stack pointer is stored here. The registers themselves live on the
/// task's own stack, pushed there by the switch primitive (or by
/// [`Task::push_initial_stack`](crate::task::Task::push_initial_stack) for a
/// task that has never run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Context {
    rsp: u64,
}

impl Context {
    pub const fn empty() -> Self {
        Context { rsp: 0 }
    }

    pub const fn new(rsp: u64) -> Self {
        Context { rsp }
    }

    pub const fn rsp(&self) -> u64 {
        self.rsp
    }
}

/// Execution substrate the [`Scheduler`](crate::scheduler::Scheduler) drives.
pub trait Arch {
    /// First code every primed task executes, called as
    /// `TRAMPOLINE(task_id, data, entry)`.
    const TRAMPOLINE: Trampoline;

    /// Runs `f` with the timer interrupt masked, restoring the previous state
    /// afterwards. Nesting must be allowed.
    fn without_interrupts<R>(&self, f: impl FnOnce() -> R) -> R;

    /// Saves the running register state into `current` and resumes the state
    /// stored in `next`. Returns only once something switches back into
    /// `current`.
    ///
    /// # Safety
    ///
    /// - `current` must be the context slot of the task that is executing.
    /// - `next` must hold a state produced by a previous switch or by
    ///   `push_initial_stack`, on a stack that is still allocated.
    /// - Never called reentrantly; interrupts are masked by the caller.
    unsafe fn switch_context(&self, next: *const Context, current: *mut Context);
}
