//! x86_64 (System V) register frame and context switch.
//!
//! A switched-out task's stack looks like this, growing downward:
//!
//!   rsp + 120 -> return address (where the task resumes)
//!   rsp + 112 -> rax
//!   rsp + 104 -> rbx
//!   ...
//!   rsp +   0 -> r15   <- Context::rsp
//!
//! `switch_context` pushes the registers in [`PUSH_ORDER`] and pops them in
//! reverse, so a hand-built frame with the same shape is indistinguishable
//! from one captured mid-call.

use super::Context;
use crate::task::{TaskFn, Trampoline};

/// General purpose registers saved by [`switch_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rdi,
    Rsi,
    Rbp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

/// Order in which `switch_context` pushes the registers.
pub const PUSH_ORDER: [Register; 15] = [
    Register::Rax,
    Register::Rbx,
    Register::Rcx,
    Register::Rdx,
    Register::Rdi,
    Register::Rsi,
    Register::Rbp,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
    Register::R12,
    Register::R13,
    Register::R14,
    Register::R15,
];

/// Return address plus the saved register image.
pub const INITIAL_FRAME_WORDS: usize = PUSH_ORDER.len() + 1;

/// Required stack alignment at a call instruction.
pub const STACK_ALIGNMENT: u64 = 16;

/// Builds the words to push, in push order, for a task that has never run.
///
/// The first word is the trampoline, acting as the return address. The
/// register image carries the trampoline's three arguments the way the
/// calling convention passes them: `rdi = task_id`, `rsi = data`,
/// `rdx = entry`. Everything else is zero.
pub fn initial_frame(
    trampoline: Trampoline,
    task_id: u64,
    data: i64,
    entry: TaskFn,
) -> [u64; INITIAL_FRAME_WORDS] {
    let mut frame = [0u64; INITIAL_FRAME_WORDS];
    frame[0] = trampoline as usize as u64;

    for (slot, register) in frame[1..].iter_mut().zip(PUSH_ORDER.iter()) {
        *slot = match register {
            Register::Rdx => entry as usize as u64,
            Register::Rdi => task_id,
            Register::Rsi => data as u64,
            _ => 0,
        };
    }

    frame
}

/// Switch execution from the running task to another one.
///
/// Pushes every general purpose register onto the current stack, stores RSP
/// into `current.rsp`, loads RSP from `next.rsp`, pops the next task's
/// registers and returns into it.
///
/// # Safety
///
/// - `current` must point to the running task's context slot.
/// - `next` must point to a context whose stack was either switched out by
///   this function or primed by `Task::push_initial_stack`.
/// - Interrupts must be masked; this function is not reentrant.
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(next: *const Context, current: *mut Context) {
    // System V AMD64 ABI: rdi = next, rsi = current
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rdi",
        "push rsi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        // Save current RSP into current->rsp
        "mov [rsi], rsp",
        // Load next task's RSP from next->rsp
        "mov rsp, [rdi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rsi",
        "pop rdi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        // Return into the next task (pops return address from stack)
        "ret",
    )
}
