use crate::arch::x86_64::INITIAL_FRAME_WORDS;

/// Size of every task stack unless configured otherwise.
pub const DEFAULT_STACK_BYTES: usize = 64 * 1024;

/// Timer ticks between two preemptive task switches (20 ms at 100 Hz).
pub const DEFAULT_TASK_TIMER_PERIOD: u64 = 2;

/// Initial frame plus the alignment word and the padding word.
const MIN_STACK_WORDS: usize = INITIAL_FRAME_WORDS + 2;

/// Tunables for a [`TaskManager`](crate::manager::TaskManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Bytes reserved for the private stack of each task.
    /// Rounded down to whole machine words, raised to the minimum a task
    /// can start on.
    pub stack_bytes: usize,
}

impl SchedulerConfig {
    pub const fn new() -> Self {
        Self {
            stack_bytes: DEFAULT_STACK_BYTES,
        }
    }

    pub const fn with_stack_bytes(mut self, stack_bytes: usize) -> Self {
        self.stack_bytes = stack_bytes;
        self
    }

    /// Whole words of stack per task, never fewer than the initial frame
    /// needs once the top is aligned and padded.
    pub(crate) const fn stack_words(&self) -> usize {
        let words = self.stack_bytes / core::mem::size_of::<u64>();
        if words < MIN_STACK_WORDS {
            MIN_STACK_WORDS
        } else {
            words
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
