pub mod heap_allocator;
pub mod page_allocator;

use bootloader_api::BootInfo;
use log::error;
use spin::Once;
use x86_64::{PhysAddr, VirtAddr};

use crate::config;

static PHYSICAL_MEMORY_OFFSET: Once<VirtAddr> = Once::new();

/// # Safety
///
/// `memory::init` must have run, and `addr` must lie inside the physical
/// memory mapped by the bootloader.
pub unsafe fn physical_to_virtual(addr: PhysAddr) -> VirtAddr {
    let offset = PHYSICAL_MEMORY_OFFSET
        .get()
        .copied()
        .unwrap_or_else(|| panic!("physical memory offset read before memory::init"));
    offset + addr.as_u64()
}

/// Sets up paging access and the kernel heap. Task stacks come from this
/// heap, so nothing may spawn a task before it returns.
pub fn init(boot_info: &'static mut BootInfo) {
    let boot_info: &'static BootInfo = boot_info;
    let Some(offset) = boot_info.physical_memory_offset.into_option() else {
        error!("bootloader did not map physical memory");
        panic!("physical memory offset not found");
    };
    let physical_memory_offset = VirtAddr::new(offset);
    PHYSICAL_MEMORY_OFFSET.call_once(|| physical_memory_offset);

    let (mut mapper, mut frame_allocator) =
        page_allocator::init(&boot_info.memory_regions, physical_memory_offset);

    if let Err(reason) = heap_allocator::init(&mut mapper, &mut frame_allocator, config::HEAP_SIZE) {
        error!("kernel heap mapping failed: {:?}", reason);
        panic!("no kernel heap");
    }
}
