use core::fmt;

extern crate alloc;
use alloc::boxed::Box;

use crate::arch::x86_64::{self, STACK_ALIGNMENT};

pub use crate::arch::Context;

/// Entry point of a task, invoked at most once as `entry(task_id, data)`.
/// Returning from it halts the task for good.
pub type TaskFn = extern "C" fn(task_id: u64, data: i64);

/// Landing point of a task's first resumption, called as
/// `trampoline(task_id, data, entry)`.
pub type Trampoline = extern "C" fn(task_id: u64, data: i64, entry: TaskFn) -> !;

const WORD: u64 = core::mem::size_of::<u64>() as u64;

/// Identifier of a task. Monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(id: u64) -> Self {
        TaskId(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task Control Block: a private stack and the context slot the switch
/// primitive saves into and resumes from.
pub struct Task {
    id: TaskId,
    context: Context,
    halted: bool,
    stack: Box<[u64]>,
}

impl Task {
    /// Allocates the stack and points the context at its aligned top.
    ///
    /// Tasks are only created through
    /// [`TaskManager::new_task`](crate::manager::TaskManager::new_task).
    pub(crate) fn new(id: TaskId, stack_words: usize) -> Self {
        let stack = alloc::vec![0u64; stack_words].into_boxed_slice();
        let stack_end = stack.as_ptr() as u64 + stack.len() as u64 * WORD;

        Task {
            id,
            context: Context::new(initial_stack_top(stack_end)),
            halted: false,
            stack,
        }
    }

    /// Primes the stack so that the first switch into this task behaves like
    /// a call to `trampoline(id, data, entry)`.
    ///
    /// Must run exactly once, before the task is first switched into.
    pub fn push_initial_stack(
        &mut self,
        entry: TaskFn,
        data: i64,
        trampoline: Trampoline,
    ) -> &mut Self {
        let frame = x86_64::initial_frame(trampoline, self.id.as_u64(), data, entry);
        let base = self.stack.as_ptr() as u64;
        let rsp = prime_stack(&mut self.stack, base, self.context.rsp(), &frame);
        self.context = Context::new(rsp);
        self
    }

    /// The context slot handed to the switch primitive.
    pub fn stack_pointer(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the entry function has returned.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stack(&self) -> &[u64] {
        &self.stack
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("halted", &self.halted)
            .field("stack_words", &self.stack.len())
            .finish()
    }
}

/// One-past-the-end of the stack, moved down a word if that is not
/// 16-byte aligned.
pub(crate) fn initial_stack_top(stack_end: u64) -> u64 {
    if (stack_end & (STACK_ALIGNMENT - 1)) != 0 {
        stack_end - WORD
    } else {
        stack_end
    }
}

/// Pushes `frame` onto `stack` (mapped at address `base`) starting at `rsp`
/// and returns the new stack pointer.
///
/// When `rsp` is 16-byte aligned a padding word goes first, standing in for
/// the return address a real call would have pushed. The trampoline then
/// starts with `rsp % 16 == 8`, as every callee expects.
pub(crate) fn prime_stack(stack: &mut [u64], base: u64, mut rsp: u64, frame: &[u64]) -> u64 {
    let aligned = rsp % STACK_ALIGNMENT == 0;
    let mut push = |value: u64| {
        rsp -= WORD;
        stack[((rsp - base) / WORD) as usize] = value;
    };

    if aligned {
        push(0); // not used
    }
    for &word in frame {
        push(word);
    }

    rsp
}
