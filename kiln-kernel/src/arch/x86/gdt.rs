use spin::Lazy;

use x86_64::VirtAddr;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;

use core::ptr::addr_of;

pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;

pub static TSS: Lazy<TaskStateSegment> = Lazy::new(|| {
    let mut tss = TaskStateSegment::new();
    tss.interrupt_stack_table[DOUBLE_FAULT_IST_INDEX as usize] = {
        const STACK_SIZE: usize = 4096 * 5;
        static mut STACK: [u8; STACK_SIZE] = [0; STACK_SIZE];

        #[allow(unused_unsafe)]
        let stack_start = VirtAddr::from_ptr(unsafe { addr_of!(STACK) });
        stack_start + STACK_SIZE as u64
    };
    tss
});

pub static GDT: Lazy<Gdt> = Lazy::new(|| {
    let mut gdt = GlobalDescriptorTable::new();
    let code_selector = gdt.append(Descriptor::kernel_code_segment());
    let data_selector = gdt.append(Descriptor::kernel_data_segment());
    let tss_selector = gdt.append(Descriptor::tss_segment(&TSS));

    Gdt {
        gdt,
        code_selector,
        data_selector,
        tss_selector,
    }
});

pub struct Gdt {
    pub gdt: GlobalDescriptorTable,
    pub code_selector: SegmentSelector,
    pub data_selector: SegmentSelector,
    pub tss_selector: SegmentSelector,
}

/// Tasks all run in ring 0, so only kernel segments are loaded.
pub fn init() {
    use x86_64::instructions::segmentation::{CS, DS, ES, SS, Segment};
    use x86_64::instructions::tables::load_tss;

    GDT.gdt.load();
    unsafe {
        CS::set_reg(GDT.code_selector);
        DS::set_reg(GDT.data_selector);
        ES::set_reg(GDT.data_selector);
        SS::set_reg(GDT.data_selector);
        load_tss(GDT.tss_selector);
    }
}
