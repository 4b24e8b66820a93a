//! Logging sink the copy engine reports through.
//!
//! The engine never formats or routes log output itself: every component receives a
//! `&dyn Sink` and emits leveled records into it. [`LogSink`] forwards to the `log`
//! facade (what the CLI uses); [`MemorySink`] keeps records in memory for tests and
//! embedding programs.

use log::Level;
use std::sync::Mutex;

/// Leveled message sink shared by the walk thread, copy workers and coordinator.
pub trait Sink: Send + Sync {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }
}

/// Forwards records to whatever logger the process installed (env_logger in the CLI).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: env!("CARGO_PKG_NAME"), level, "{}", message);
    }
}

/// Collects `(level, message)` pairs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages emitted at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.messages_at(level).len()
    }
}

impl Sink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}
