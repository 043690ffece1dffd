//! Basic logging facilities used with the `log` crate.

use core::fmt::Write;
use core::marker::Send;

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Extended `Log` interface for the loader.
pub trait LogExt {
    /// Check if the logger impl is locked. For example, if a logging operation
    /// itself caused a panic, it can be left in a locked (and invalid) state. A
    /// panic handler may check this and use a backup method if so.
    fn is_locked(&self) -> bool;
}

/// Writes formatted log messages to any `core::fmt::Write` impl, such as the
/// operator console. Locks internally.
pub struct LogSink<W> {
    writer: Mutex<W>,
    level: LevelFilter,
}

impl<W: Write + Send> LogSink<W> {
    pub fn new(writer: W, level: LevelFilter) -> Self {
        LogSink {
            writer: Mutex::new(writer),
            level,
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Gives back the writer, e.g. to inspect what was logged.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Log for LogSink<W> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut writer = self.writer.lock();
        let _ = writeln!(
            &mut writer,
            "[{}] {}: {}",
            level_as_string(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // Console writes are unbuffered.
    }
}

impl<W: Write + Send> LogExt for LogSink<W> {
    fn is_locked(&self) -> bool {
        self.writer.is_locked()
    }
}

fn level_as_string(level: Level) -> &'static str {
    use Level::*;

    match level {
        Error => "ERROR",
        Warn => " WARN",
        Info => " INFO",
        Debug => "DEBUG",
        Trace => "TRACE",
    }
}
