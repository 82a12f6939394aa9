//! Boot-time tasks that keep the scheduler busy. Two counters share the
//! processor, a waiter sleeps until a pacer wakes it, and one task returns
//! right away.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicU64, Ordering};

use kiln_task::{TaskId, Timer};
use log::{info, warn};

use crate::task::Kernel;

const REPORT_EVERY: u64 = 50_000_000;
const PACER_DELAY: u64 = 200_000_000;
const HELLO_TIMER_TICKS: u64 = 100;
const HELLO_TIMER_VALUE: i32 = 1;

static WAKEUPS: AtomicU64 = AtomicU64::new(0);

extern "C" fn counter(task_id: u64, data: i64) {
    let mut count: u64 = 0;
    loop {
        count = count.wrapping_add(1);
        if count % REPORT_EVERY == 0 {
            info!("task {} ({}): count {}", task_id, data, count);
        }
    }
}

/// Puts itself to sleep and reports every wakeup.
extern "C" fn waiter(task_id: u64, _data: i64) {
    let Some(kernel) = crate::task::kernel() else {
        return;
    };

    loop {
        kernel.scheduler().current().sleep();
        let wakeups = WAKEUPS.fetch_add(1, Ordering::Relaxed) + 1;
        info!("task {} woken ({} so far)", task_id, wakeups);
    }
}

/// Wakes the task whose id is `data` after every busy delay.
extern "C" fn pacer(task_id: u64, data: i64) {
    let Some(kernel) = crate::task::kernel() else {
        return;
    };
    let target = TaskId::new(data as u64);

    loop {
        for _ in 0..PACER_DELAY {
            spin_loop();
        }
        if let Err(reason) = kernel.scheduler().wakeup(target) {
            warn!("task {}: {}", task_id, reason);
            return;
        }
    }
}

extern "C" fn one_shot(task_id: u64, data: i64) {
    info!("task {} started with {}, returning", task_id, data);
}

pub fn spawn(kernel: &Kernel) {
    let scheduler = kernel.scheduler();

    scheduler.spawn(counter, 1);
    scheduler.spawn(counter, 2);

    let waiter = scheduler.new_task(waiter, 0);
    scheduler.spawn(pacer, waiter.as_u64() as i64);
    if let Err(reason) = scheduler.wakeup(waiter) {
        warn!("{}", reason);
    }

    scheduler.spawn(one_shot, 42);

    kernel.add_timer(Timer::new(
        kernel.current_tick() + HELLO_TIMER_TICKS,
        HELLO_TIMER_VALUE,
    ));

    let ready = scheduler.with_manager(|manager| manager.ready_ids().count());
    info!("spawned demo tasks, {} ready", ready);
}
