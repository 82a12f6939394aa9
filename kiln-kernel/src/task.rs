//! Wires the scheduler to the processor: the context switch, the task entry
//! trampoline and the task timer.

use kiln_task::{
    Arch, Context, Scheduler, SchedulerConfig, TASK_TIMER_VALUE, TaskFn, TaskId, Timer,
    TimerManager, Trampoline,
};
use log::{debug, info};
use spin::{Mutex, Once};
use x86_64::instructions::{hlt, interrupts};

pub struct KernelArch;

impl Arch for KernelArch {
    const TRAMPOLINE: Trampoline = start_task;

    fn without_interrupts<R>(&self, f: impl FnOnce() -> R) -> R {
        interrupts::without_interrupts(f)
    }

    unsafe fn switch_context(&self, next: *const Context, current: *mut Context) {
        unsafe { kiln_task::arch::x86_64::switch_context(next, current) }
    }
}

/// First code every spawned task runs. A task is always entered from inside
/// a switch, with interrupts masked.
extern "C" fn start_task(task_id: u64, data: i64, entry: TaskFn) -> ! {
    interrupts::enable();
    entry(task_id, data);

    let id = TaskId::new(task_id);
    debug!("task {} returned", id);
    if let Some(kernel) = kernel() {
        kernel.scheduler().exit(id);
    }

    loop {
        hlt();
    }
}

/// Services shared by the timer interrupt and every task.
pub struct Kernel {
    timer: Mutex<TimerManager>,
    scheduler: Scheduler<KernelArch>,
}

static KERNEL: Once<Kernel> = Once::new();

pub fn kernel() -> Option<&'static Kernel> {
    KERNEL.get()
}

impl Kernel {
    pub fn scheduler(&self) -> &Scheduler<KernelArch> {
        &self.scheduler
    }

    pub fn current_tick(&self) -> u64 {
        interrupts::without_interrupts(|| self.timer.lock().current_tick())
    }

    pub fn add_timer(&self, timer: Timer) {
        interrupts::without_interrupts(|| self.timer.lock().add_timer(timer));
    }

    /// Timer interrupt bookkeeping. Returns whether the task timer expired.
    pub(crate) fn tick(&self) -> bool {
        self.timer.lock().tick(|timer| {
            debug!("timer {} expired at tick {}", timer.value(), timer.timeout());
        })
    }
}

/// Makes the running code task 1 and arms the task timer one period ahead.
pub fn initialize_task(config: SchedulerConfig, task_timer_period: u64) -> &'static Kernel {
    let kernel = KERNEL.call_once(|| Kernel {
        timer: Mutex::new(TimerManager::new(task_timer_period)),
        scheduler: Scheduler::new(KernelArch, config),
    });

    interrupts::without_interrupts(|| {
        let mut timer = kernel.timer.lock();
        let timeout = timer.current_tick() + timer.task_timer_period();
        timer.add_timer(Timer::new(timeout, TASK_TIMER_VALUE));
    });

    info!(
        "task manager ready, switching every {} ticks",
        task_timer_period.max(1)
    );
    kernel
}
