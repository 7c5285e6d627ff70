//! Last-resort reporting of sink failures
//!
//! Failures are written as single `[LOGGER ERROR]` lines to standard error
//! (or an injected writer). A run of consecutive failures of one sink is
//! reported once when it starts, then every [`REPORT_EVERY`] failures, and
//! once more when the sink recovers.

use super::metrics::LoggerMetrics;
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Consecutive failures between repeated reports of the same streak.
pub const REPORT_EVERY: u64 = 1000;

pub struct FailureReporter {
    writer: Mutex<Box<dyn Write + Send>>,
    metrics: Arc<LoggerMetrics>,
}

impl FailureReporter {
    /// Reporter writing to standard error.
    pub fn stderr(metrics: Arc<LoggerMetrics>) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), metrics)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, metrics: Arc<LoggerMetrics>) -> Self {
        Self {
            writer: Mutex::new(writer),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<LoggerMetrics> {
        &self.metrics
    }

    /// Note the `consecutive`-th failure in a row of `sink`.
    ///
    /// Returns whether a diagnostic line was written.
    pub fn failure(&self, sink: &str, error: &dyn fmt::Display, consecutive: u64) -> bool {
        if consecutive != 1 && consecutive % REPORT_EVERY != 0 {
            return false;
        }
        if consecutive == 1 {
            self.write_line(format_args!("[LOGGER ERROR] {}", error))
        } else {
            self.write_line(format_args!(
                "[LOGGER ERROR] {} (sink '{}' failed {} times in a row)",
                error, sink, consecutive
            ))
        }
    }

    /// Note that `sink` succeeded again after `failures` failed attempts.
    pub fn recovered(&self, sink: &str, failures: u64) -> bool {
        self.write_line(format_args!(
            "[LOGGER WARNING] Sink '{}' recovered after {} failed attempts",
            sink, failures
        ))
    }

    pub(crate) fn warning(&self, message: fmt::Arguments<'_>) -> bool {
        self.write_line(format_args!("[LOGGER WARNING] {}", message))
    }

    fn write_line(&self, line: fmt::Arguments<'_>) -> bool {
        let mut writer = self.writer.lock();
        // A reporter that cannot write has nowhere left to report to
        let written = writeln!(writer, "{}", line).and_then(|_| writer.flush()).is_ok();
        if written {
            self.metrics.record_failure_report();
        }
        written
    }
}

impl fmt::Debug for FailureReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureReporter").finish_non_exhaustive()
    }
}
