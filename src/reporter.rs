//! User-facing reporting
//!
//! Regeneration outcomes surface through a [`Reporter`]. `panic` marks a fatal
//! condition; the caller decides how to terminate.

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Prefix of every user-visible message
pub const REPORT_PREFIX: &str = "[graphql-typegen]";

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn panic(&self, message: &str);
}

/// Reporter that emits `tracing` events
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!(target: "graphql_typegen::report", "{} {}", REPORT_PREFIX, message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "graphql_typegen::report", "{} {}", REPORT_PREFIX, message);
    }

    fn panic(&self, message: &str) {
        error!(target: "graphql_typegen::report", fatal = true, "{} {}", REPORT_PREFIX, message);
    }
}

/// Severity of a recorded report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Panic,
}

/// Reporter that keeps every message in memory, for hosts that render
/// reports themselves
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<(ReportLevel, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(ReportLevel, String)> {
        self.entries.lock().clone()
    }

    /// Messages recorded at `level`, in order
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn record(&self, level: ReportLevel, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.record(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(ReportLevel::Warn, message);
    }

    fn panic(&self, message: &str) {
        self.record(ReportLevel::Panic, message);
    }
}
