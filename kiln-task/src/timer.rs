//! Tick counter and one-shot timers driven by the periodic timer interrupt.

use core::cmp::Ordering;

extern crate alloc;
use alloc::collections::BinaryHeap;

/// Value of the timer that drives preemptive task switching.
pub const TASK_TIMER_VALUE: i32 = i32::MIN;

/// A one-shot timer firing once the tick counter reaches `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    timeout: u64,
    value: i32,
}

impl Timer {
    pub const fn new(timeout: u64, value: i32) -> Self {
        Timer { timeout, value }
    }

    pub const fn timeout(&self) -> u64 {
        self.timeout
    }

    pub const fn value(&self) -> i32 {
        self.value
    }
}

// BinaryHeap is a max-heap; the earliest timeout must come out first.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timeout
            .cmp(&self.timeout)
            .then_with(|| other.value.cmp(&self.value))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TimerManager {
    tick: u64,
    timers: BinaryHeap<Timer>,
    task_timer_period: u64,
}

impl TimerManager {
    /// `task_timer_period` is the number of ticks between two task switches;
    /// zero is treated as one.
    pub fn new(task_timer_period: u64) -> Self {
        TimerManager {
            tick: 0,
            timers: BinaryHeap::new(),
            task_timer_period: task_timer_period.max(1),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn task_timer_period(&self) -> u64 {
        self.task_timer_period
    }

    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(timer);
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Advances the tick counter and fires every expired timer.
    ///
    /// The task timer is re-armed one period ahead and makes this return
    /// `true`; every other expired timer is passed to `on_timeout`.
    pub fn tick(&mut self, mut on_timeout: impl FnMut(Timer)) -> bool {
        self.tick += 1;

        let mut task_timer_timeout = false;
        while let Some(&timer) = self.timers.peek() {
            if timer.timeout > self.tick {
                break;
            }
            self.timers.pop();

            if timer.value == TASK_TIMER_VALUE {
                task_timer_timeout = true;
                self.timers.push(Timer::new(
                    self.tick + self.task_timer_period,
                    TASK_TIMER_VALUE,
                ));
                continue;
            }

            on_timeout(timer);
        }

        task_timer_timeout
    }
}
