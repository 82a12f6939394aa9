mod scheduler;

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::arch::{Arch, Context};
use crate::config::SchedulerConfig;
use crate::scheduler::Scheduler;
use crate::task::{TaskFn, TaskId, Trampoline};

/// Stands in for the processor: records every switch it is asked to make
/// instead of making it, and tracks interrupt masking.
pub(crate) struct RecordingArch {
    switches: Mutex<Vec<(usize, usize)>>,
    masked: AtomicUsize,
}

impl RecordingArch {
    pub(crate) fn new() -> Self {
        RecordingArch {
            switches: Mutex::new(Vec::new()),
            masked: AtomicUsize::new(0),
        }
    }

    pub(crate) fn switch_count(&self) -> usize {
        self.switches.lock().len()
    }
}

impl Arch for RecordingArch {
    const TRAMPOLINE: Trampoline = never_started;

    fn without_interrupts<R>(&self, f: impl FnOnce() -> R) -> R {
        self.masked.fetch_add(1, Ordering::SeqCst);
        let result = f();
        self.masked.fetch_sub(1, Ordering::SeqCst);
        result
    }

    unsafe fn switch_context(&self, next: *const Context, current: *mut Context) {
        assert!(
            self.masked.load(Ordering::SeqCst) > 0,
            "switch with interrupts enabled"
        );
        self.switches.lock().push((current as usize, next as usize));
    }
}

extern "C" fn never_started(_task_id: u64, _data: i64, _entry: TaskFn) -> ! {
    unreachable!("recorded switches never run a task")
}

pub(crate) extern "C" fn idle_entry(_task_id: u64, _data: i64) {}

/// Small stacks keep the tests cheap; the layout does not depend on size.
pub(crate) fn scheduler() -> Scheduler<RecordingArch> {
    Scheduler::new(
        RecordingArch::new(),
        SchedulerConfig::new().with_stack_bytes(4096),
    )
}

pub(crate) fn ids(raw: &[u64]) -> Vec<TaskId> {
    raw.iter().copied().map(TaskId::new).collect()
}

pub(crate) fn ready(scheduler: &Scheduler<RecordingArch>) -> Vec<TaskId> {
    scheduler.with_manager(|manager| manager.ready_ids().collect())
}

/// Task ids of the (saved-into, resumed-from) context slots of every
/// recorded switch.
pub(crate) fn switch_log(scheduler: &Scheduler<RecordingArch>) -> Vec<(TaskId, TaskId)> {
    let slot_owner = |slot: usize| {
        scheduler.with_manager(|manager| {
            (1..=manager.task_count() as u64)
                .map(TaskId::new)
                .find(|&id| {
                    manager
                        .task(id)
                        .is_some_and(|task| task.context() as *const Context as usize == slot)
                })
                .expect("switch slot does not belong to any task")
        })
    };

    let switches = scheduler.arch().switches.lock().clone();
    switches
        .into_iter()
        .map(|(current, next)| (slot_owner(current), slot_owner(next)))
        .collect()
}

/// Task resumed by each recorded switch, oldest first.
pub(crate) fn resumed(scheduler: &Scheduler<RecordingArch>) -> Vec<TaskId> {
    switch_log(scheduler).into_iter().map(|(_, next)| next).collect()
}

/// Queue invariants: front present unless the running task has halted, no
/// duplicates, every entry registered and none of them halted.
pub(crate) fn assert_queue_consistent(scheduler: &Scheduler<RecordingArch>) {
    scheduler.with_manager(|manager| {
        let queue: Vec<TaskId> = manager.ready_ids().collect();
        let current_halted = manager
            .task(manager.current_id())
            .is_some_and(|task| task.is_halted());
        assert!(!queue.is_empty() || current_halted);
        for (index, id) in queue.iter().enumerate() {
            let task = manager.task(*id);
            assert!(task.is_some(), "queued task {} is not registered", id);
            assert!(
                !task.is_some_and(|task| task.is_halted()),
                "halted task {} is queued",
                id
            );
            assert!(
                !queue[index + 1..].contains(id),
                "task {} queued twice: {:?}",
                id,
                queue
            );
        }
    });
}
