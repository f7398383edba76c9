//! Output boundary for status reports.

use std::io::Write;
use std::sync::Mutex;

/// Line-oriented text sink receiving rendered status reports.
pub trait ReportSink: Send + Sync {
    /// Emit one rendered report. Reports end with a newline.
    fn emit(&self, report: &str);
}

/// Writes reports to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, report: &str) {
        let mut stdout = std::io::stdout().lock();
        // Write errors are dropped.
        let _ = stdout.write_all(report.as_bytes());
        let _ = stdout.flush();
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    reports: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports emitted so far, oldest first.
    pub fn reports(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent report, if any.
    pub fn last(&self) -> Option<String> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

impl ReportSink for BufferSink {
    fn emit(&self, report: &str) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.to_string());
    }
}
