use log::{debug, error, trace};

extern crate alloc;
use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};

use crate::arch::Context;
use crate::config::SchedulerConfig;
use crate::error::{Result, TaskError};
use crate::task::{Task, TaskId};

/// Context slots of one pending switch, handed to
/// [`Arch::switch_context`](crate::arch::Arch::switch_context).
#[must_use = "the queue already reflects the switch; it has to be performed"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub current: *mut Context,
    pub next: *const Context,
}

/// Registry of every task plus the round-robin ready queue.
///
/// The queue is stored as the running task followed by the tasks waiting
/// behind it, so it only runs dry when the running task has halted. Operations that change which task
/// runs return a [`Switch`] and are only reachable through the
/// [`Scheduler`](crate::scheduler::Scheduler), which performs it.
pub struct TaskManager {
    tasks: BTreeMap<TaskId, Box<Task>>,
    current: TaskId,
    ready_queue: VecDeque<TaskId>,
    latest_id: u64,
    config: SchedulerConfig,
}

impl TaskManager {
    /// Registers task 1 for the caller's own execution context and makes it
    /// the running task. Its stack is never primed: it is already running.
    pub fn new(config: SchedulerConfig) -> Self {
        let mut manager = TaskManager {
            tasks: BTreeMap::new(),
            current: TaskId::new(0),
            ready_queue: VecDeque::new(),
            latest_id: 0,
            config,
        };
        manager.current = manager.new_task().id();
        manager
    }

    /// Creates and registers a task. It has to be primed with
    /// [`Task::push_initial_stack`] and woken before it ever runs.
    pub fn new_task(&mut self) -> &mut Task {
        self.latest_id += 1;
        let id = TaskId::new(self.latest_id);
        let stack_words = self.config.stack_words();
        debug!("task {} created ({} stack words)", id, stack_words);

        self.tasks
            .entry(id)
            .or_insert_with(|| Box::new(Task::new(id, stack_words)))
            .as_mut()
    }

    /// The task at the front of the ready queue.
    pub fn current_id(&self) -> TaskId {
        self.current
    }

    /// Ready queue contents, front first. A halted running task is left out:
    /// it only keeps the processor until something else becomes ready.
    pub fn ready_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        let current = (!self.is_halted(self.current)).then_some(self.current);
        current.into_iter().chain(self.ready_queue.iter().copied())
    }

    pub fn is_ready(&self, id: TaskId) -> bool {
        (self.current == id && !self.is_halted(id)) || self.ready_queue.contains(&id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id).map(Box::as_ref)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Moves the running task to the back of the queue (or drops it from the
    /// queue when `current_sleep`) and selects the new front.
    ///
    /// A halted running task is never put back, whatever `current_sleep` says.
    pub(crate) fn rotate(&mut self, current_sleep: bool) -> Option<Switch> {
        let current = self.current;
        let halted = self.is_halted(current);
        if !current_sleep && !halted {
            self.ready_queue.push_back(current);
        }

        let Some(next) = self.ready_queue.pop_front() else {
            if halted {
                trace!("task {} halted, nothing else ready", current);
            } else {
                error!("task {} tried to sleep with nothing else ready", current);
            }
            return None;
        };
        self.current = next;

        trace!("switch {} -> {}", current, next);
        self.switch_between(current, next)
    }

    /// Takes `id` out of the ready queue; switches away if it is running.
    pub(crate) fn sleep_queued(&mut self, id: TaskId) -> Option<Switch> {
        if self.current == id {
            debug!("task {} going to sleep", id);
            return self.rotate(true);
        }

        if let Some(index) = self.ready_queue.iter().position(|&t| t == id) {
            debug!("task {} put to sleep", id);
            self.ready_queue.remove(index);
        }
        None
    }

    /// Appends `id` to the ready queue unless it is already there or halted.
    pub(crate) fn wakeup_queued(&mut self, id: TaskId) {
        if self.is_halted(id) {
            debug!("task {} has halted, not waking it", id);
            return;
        }

        if !self.is_ready(id) {
            debug!("task {} woken up", id);
            self.ready_queue.push_back(id);
        }
    }

    pub fn wakeup(&mut self, id: TaskId) -> Result<()> {
        self.ensure_exists(id)?;
        self.wakeup_queued(id);
        Ok(())
    }

    /// Marks `id` halted and takes it out of rotation for good.
    pub(crate) fn exit(&mut self, id: TaskId) -> Option<Switch> {
        match self.tasks.get_mut(&id) {
            Some(task) => task.halt(),
            None => return None,
        }

        debug!("task {} returned from its entry function", id);
        self.sleep_queued(id)
    }

    pub(crate) fn ensure_exists(&self, id: TaskId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TaskError::NoSuchTask(id))
        }
    }

    fn is_halted(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|task| task.is_halted())
    }

    fn switch_between(&mut self, current: TaskId, next: TaskId) -> Option<Switch> {
        let current = self.tasks.get_mut(&current)?.stack_pointer() as *mut Context;
        let next = self.tasks.get(&next)?.context() as *const Context;

        Some(Switch { current, next })
    }
}
