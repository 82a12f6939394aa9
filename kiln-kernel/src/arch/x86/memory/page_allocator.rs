use bootloader_api::info::{MemoryRegionKind, MemoryRegions};
use log::debug;
use x86_64::registers::control::Cr3;
use x86_64::structures::paging::{FrameAllocator, OffsetPageTable, PageTable, PhysFrame, Size4KiB};
use x86_64::{PhysAddr, VirtAddr};

/// Hands out usable frames in memory map order and never takes them back.
pub struct BootFrameAllocator {
    memory_map: &'static MemoryRegions,
    next: usize,
}

impl BootFrameAllocator {
    /// # Safety
    ///
    /// Every region marked usable in `memory_map` must really be unused.
    pub unsafe fn init(memory_map: &'static MemoryRegions) -> Self {
        BootFrameAllocator {
            memory_map,
            next: 0,
        }
    }

    fn usable_frames(&self) -> impl Iterator<Item = PhysFrame> {
        let regions = self.memory_map.iter();
        let usable_regions = regions.filter(|r| r.kind == MemoryRegionKind::Usable);
        let addr_ranges = usable_regions.map(|r| r.start..r.end);
        let frame_addresses = addr_ranges.flat_map(|r| r.step_by(4096));
        frame_addresses.map(|addr| PhysFrame::containing_address(PhysAddr::new(addr)))
    }
}

unsafe impl FrameAllocator<Size4KiB> for BootFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let frame = self.usable_frames().nth(self.next);
        self.next += 1;
        frame
    }
}

/// # Safety
///
/// All physical memory must be mapped at `physical_memory_offset`, and the
/// returned table must not be aliased.
pub unsafe fn active_level_4_table(physical_memory_offset: VirtAddr) -> &'static mut PageTable {
    let (level_4_table_frame, _) = Cr3::read();

    let phys = level_4_table_frame.start_address();
    let virt = physical_memory_offset + phys.as_u64();
    let page_table_ptr: *mut PageTable = virt.as_mut_ptr();

    unsafe { &mut *page_table_ptr }
}

pub fn init(
    memory_regions: &'static MemoryRegions,
    physical_memory_offset: VirtAddr,
) -> (OffsetPageTable<'static>, BootFrameAllocator) {
    for region in memory_regions.iter() {
        debug!(
            "memory region: {:#x} - {:#x} ({:#x} bytes) - {:?}",
            region.start,
            region.end,
            region.end - region.start,
            region.kind
        );
    }

    unsafe {
        let level_4_table = active_level_4_table(physical_memory_offset);
        let table = OffsetPageTable::new(level_4_table, physical_memory_offset);
        let frame_allocator = BootFrameAllocator::init(memory_regions);

        (table, frame_allocator)
    }
}
