use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config;
use crate::serial_println;

struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = match record.level() {
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Warn => "\x1b[33m WARN\x1b[0m",
            Level::Info => "\x1b[32m INFO\x1b[0m",
            Level::Debug => "\x1b[34mDEBUG\x1b[0m",
            Level::Trace => "\x1b[35mTRACE\x1b[0m",
        };
        serial_println!("{} {}: {}", level, record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

pub fn init() {
    let level = config::LOG_LEVEL
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);

    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .ok();
}
