#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]

extern crate alloc;

mod arch;
mod config;
mod demo;
mod logging;
mod task;

use bootloader_api::config::Mapping;
use bootloader_api::{BootInfo, BootloaderConfig, entry_point};

pub static BOOTLOADER_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.mappings.physical_memory = Some(Mapping::Dynamic);
    config
};

entry_point!(kernel, config = &BOOTLOADER_CONFIG);

/// This is the entry point for the x86-64 kernel.
fn kernel(boot_info: &'static mut BootInfo) -> ! {
    arch::x86::entry(boot_info)
}
