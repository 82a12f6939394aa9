//! Values baked in by `build.rs` from `build-config/`.

use kiln_task::SchedulerConfig;

pub const LOG_LEVEL: &str = env!("KILN_LOG_LEVEL");
pub const TASK_STACK_BYTES: usize = parse(env!("KILN_TASK_STACK_BYTES")) as usize;
pub const TASK_TIMER_PERIOD: u64 = parse(env!("KILN_TASK_TIMER_PERIOD"));
pub const LAPIC_TIMER_INITIAL: u32 = parse(env!("KILN_LAPIC_TIMER_INITIAL")) as u32;
pub const HEAP_SIZE: usize = parse(env!("KILN_HEAP_SIZE")) as usize;

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig::new().with_stack_bytes(TASK_STACK_BYTES)
}

/// Parses a decimal integer, as rendered by `toml` for integer values.
const fn parse(value: &str) -> u64 {
    let bytes = value.as_bytes();
    assert!(!bytes.is_empty(), "empty build config value");

    let mut result: u64 = 0;
    let mut index = 0;
    while index < bytes.len() {
        let digit = bytes[index];
        assert!(digit.is_ascii_digit(), "build config value is not a decimal integer");
        result = result * 10 + (digit - b'0') as u64;
        index += 1;
    }
    result
}
