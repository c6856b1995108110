//! Batch diagnostics.
//!
//! Library code reports skipped lines, failed files and summaries through a
//! [`Reporter`] instead of writing to the console, so a batch run can be
//! observed by tests or redirected by the caller.

use std::cell::RefCell;
use std::fmt;

/// Sink for batch diagnostics.
pub trait Reporter {
    /// Progress and results.
    fn info(&self, message: &str);

    /// A recoverable failure. The batch continues.
    fn error(&self, message: &str);
}

/// Reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Reporter that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    infos: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files looked at
    pub examined: usize,
    /// Files rewritten on disk
    pub modified: usize,
    /// Files that could not be read, transformed or written
    pub failed: usize,
}

impl BatchSummary {
    /// Fold another summary into this one.
    pub fn merge(&mut self, other: BatchSummary) {
        self.examined += other.examined;
        self.modified += other.modified;
        self.failed += other.failed;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "modified {} of {} file(s), {} failed",
            self.modified, self.examined, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_collects() {
        let reporter = MemoryReporter::new();
        reporter.info("started");
        reporter.error("bad line");
        reporter.info("done");

        assert_eq!(reporter.infos(), vec!["started", "done"]);
        assert_eq!(reporter.errors(), vec!["bad line"]);
    }

    #[test]
    fn test_summary_merge_and_display() {
        let mut total = BatchSummary {
            examined: 3,
            modified: 1,
            failed: 0,
        };
        total.merge(BatchSummary {
            examined: 2,
            modified: 2,
            failed: 1,
        });

        assert_eq!(total.examined, 5);
        assert_eq!(total.modified, 3);
        assert_eq!(total.to_string(), "modified 3 of 5 file(s), 1 failed");
    }
}
