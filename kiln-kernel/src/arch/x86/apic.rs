use conquer_once::spin::OnceCell;
use log::{debug, error};
use spin::Mutex;
use x2apic::lapic::{LocalApic, LocalApicBuilder, TimerDivide, TimerMode, xapic_base};
use x86_64::{PhysAddr, instructions::port::Port};

pub const TIMER_VECTOR: u8 = 32;
pub const ERROR_VECTOR: u8 = 51;
pub const SPURIOUS_VECTOR: u8 = 0xff;

static LAPIC: OnceCell<Mutex<LApic>> = OnceCell::uninit();

pub struct LApic {
    lapic: LocalApic,
}

// Single processor; the registers are only touched with interrupts masked.
unsafe impl Send for LApic {}

impl LApic {
    fn new(timer_initial: u32) -> Result<Self, &'static str> {
        let addr = unsafe { super::memory::physical_to_virtual(PhysAddr::new(xapic_base())) };

        let lapic = LocalApicBuilder::default()
            .timer_vector(TIMER_VECTOR as usize)
            .error_vector(ERROR_VECTOR as usize)
            .spurious_vector(SPURIOUS_VECTOR as usize)
            .timer_mode(TimerMode::Periodic)
            .timer_divide(TimerDivide::Div16)
            .timer_initial(timer_initial)
            .set_xapic_base(addr.as_u64())
            .build()?;

        Ok(Self { lapic })
    }

    fn enable(&mut self) {
        unsafe { self.lapic.enable() };
    }

    fn end_interrupts(&mut self) {
        unsafe { self.lapic.end_of_interrupt() };
    }
}

/// Remaps and masks the legacy 8259 pair so that only the local APIC raises
/// interrupts.
fn disable_8259() {
    unsafe {
        let mut cmd_8259a = Port::<u8>::new(0x20);
        let mut data_8259a = Port::<u8>::new(0x21);
        let mut cmd_8259b = Port::<u8>::new(0xa0);
        let mut data_8259b = Port::<u8>::new(0xa1);

        let mut spin_port = Port::<u8>::new(0x80);
        let mut spin = || spin_port.write(0);

        cmd_8259a.write(0x11);
        cmd_8259b.write(0x11);
        spin();

        data_8259a.write(0xf8);
        data_8259b.write(0xff);
        spin();

        data_8259a.write(0b100);
        spin();

        data_8259b.write(0b10);
        spin();

        data_8259a.write(0x1);
        data_8259b.write(0x1);
        spin();

        data_8259a.write(u8::MAX);
        data_8259b.write(u8::MAX);
    }
}

/// Starts the local APIC timer in periodic mode. Every expiry raises
/// `TIMER_VECTOR`, which drives the tick counter.
pub fn init(timer_initial: u32) {
    disable_8259();

    let mut lapic = match LApic::new(timer_initial) {
        Ok(lapic) => lapic,
        Err(reason) => {
            error!("local apic unavailable: {}", reason);
            panic!("cannot start the task timer");
        }
    };
    lapic.enable();

    LAPIC.init_once(|| Mutex::new(lapic));
    debug!("local apic timer running, initial count {}", timer_initial);
}

pub fn end_of_interrupt() {
    if let Some(lapic) = LAPIC.get() {
        lapic.lock().end_interrupts();
    }
}
