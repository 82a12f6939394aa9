pub mod apic;
pub mod gdt;
pub mod interrupts;
pub mod memory;
pub mod serial;

use core::panic::PanicInfo;

use bootloader_api::BootInfo;
use log::{error, info};

use crate::config;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    x86_64::instructions::interrupts::disable();
    error!("{}", info);

    loop {
        x86_64::instructions::hlt();
    }
}

pub fn entry(boot_info: &'static mut BootInfo) -> ! {
    crate::logging::init();
    info!("kiln kernel booting");

    gdt::init();
    interrupts::init();
    memory::init(boot_info);

    let kernel = crate::task::initialize_task(config::scheduler_config(), config::TASK_TIMER_PERIOD);
    apic::init(config::LAPIC_TIMER_INITIAL);
    crate::demo::spawn(kernel);

    info!("enabling interrupts, task {} goes idle", kernel.scheduler().current_id());
    x86_64::instructions::interrupts::enable();

    loop {
        x86_64::instructions::hlt();
    }
}
