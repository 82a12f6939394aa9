//! Interrupt-safe front end of the [`TaskManager`].
//!
//! A `Scheduler` is the one handle the rest of the kernel holds: interrupt
//! handlers call [`Scheduler::switch_task`] on every task timer tick, and task
//! code sleeps and wakes through it or through a [`TaskRef`].

use log::debug;
use spin::Mutex;

use crate::arch::Arch;
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::manager::{Switch, TaskManager};
use crate::task::{TaskFn, TaskId};

pub struct Scheduler<A: Arch> {
    manager: Mutex<TaskManager>,
    arch: A,
}

impl<A: Arch> Scheduler<A> {
    /// Builds the task manager around the caller, which becomes task 1.
    pub fn new(arch: A, config: SchedulerConfig) -> Self {
        debug!("scheduler: stack size {} bytes", config.stack_bytes);
        Scheduler {
            manager: Mutex::new(TaskManager::new(config)),
            arch,
        }
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// Runs `f` on the task manager with the timer interrupt masked.
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut TaskManager) -> R) -> R {
        self.arch.without_interrupts(|| f(&mut self.manager.lock()))
    }

    /// Creates a task primed to run `entry(id, data)` without enqueueing it.
    pub fn new_task(&self, entry: TaskFn, data: i64) -> TaskId {
        self.with_manager(|manager| {
            manager
                .new_task()
                .push_initial_stack(entry, data, A::TRAMPOLINE)
                .id()
        })
    }

    /// Creates a task and appends it to the ready queue.
    pub fn spawn(&self, entry: TaskFn, data: i64) -> TaskId {
        self.with_manager(|manager| {
            let id = manager
                .new_task()
                .push_initial_stack(entry, data, A::TRAMPOLINE)
                .id();
            manager.wakeup_queued(id);
            id
        })
    }

    /// Round-robin step. With `current_sleep` the running task leaves the
    /// ready queue instead of moving to its back.
    ///
    /// Returns once some later switch resumes the calling task.
    pub fn switch_task(&self, current_sleep: bool) {
        self.perform(|manager| manager.rotate(current_sleep));
    }

    /// Removes `id` from the ready queue, switching away if it is the caller.
    pub fn sleep(&self, id: TaskId) -> Result<()> {
        // Tasks are never unregistered, so the check cannot go stale.
        self.with_manager(|manager| manager.ensure_exists(id))?;
        self.perform(|manager| manager.sleep_queued(id));
        Ok(())
    }

    /// Appends `id` to the ready queue. Never switches.
    pub fn wakeup(&self, id: TaskId) -> Result<()> {
        self.with_manager(|manager| manager.wakeup(id))
    }

    /// Halts `id` permanently. Called by the trampoline once the entry
    /// function returns; does not come back when `id` is the caller.
    pub fn exit(&self, id: TaskId) {
        self.perform(|manager| manager.exit(id));
    }

    pub fn current_id(&self) -> TaskId {
        self.with_manager(|manager| manager.current_id())
    }

    /// Handle on the running task.
    pub fn current(&self) -> TaskRef<'_, A> {
        TaskRef {
            id: self.current_id(),
            scheduler: self,
        }
    }

    /// Handle on any task ever created.
    pub fn task(&self, id: TaskId) -> Option<TaskRef<'_, A>> {
        let exists = self.with_manager(|manager| manager.contains(id));
        exists.then_some(TaskRef {
            id,
            scheduler: self,
        })
    }

    fn perform(&self, f: impl FnOnce(&mut TaskManager) -> Option<Switch>) {
        self.arch.without_interrupts(|| {
            let switch = {
                let mut manager = self.manager.lock();
                f(&mut manager)
            };

            // The lock is released: the task we resume may take it right away.
            if let Some(Switch { current, next }) = switch {
                unsafe { self.arch.switch_context(next, current) };
            }
        })
    }
}

/// A task known to exist, bound to the scheduler that owns it.
pub struct TaskRef<'a, A: Arch> {
    id: TaskId,
    scheduler: &'a Scheduler<A>,
}

impl<A: Arch> TaskRef<'_, A> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Takes the task out of rotation; no-op if it already is.
    pub fn sleep(&self) -> &Self {
        self.scheduler.perform(|manager| manager.sleep_queued(self.id));
        self
    }

    /// Puts the task back into rotation; no-op if it already is.
    pub fn wakeup(&self) -> &Self {
        self.scheduler.with_manager(|manager| manager.wakeup_queued(self.id));
        self
    }

    pub fn is_halted(&self) -> bool {
        self.scheduler.with_manager(|manager| {
            manager.task(self.id).is_some_and(|task| task.is_halted())
        })
    }
}
