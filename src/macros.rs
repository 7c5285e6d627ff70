//! Logging macros with `format!`-style arguments.
//!
//! The macros work with anything exposing the severity methods, so both
//! [`MasterLogger`](crate::MasterLogger) and
//! [`LoggerHandle`](crate::LoggerHandle) can be passed.
//!
//! # Examples
//!
//! ```
//! use master_logger::{info, warning, MasterLogger};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let logger = MasterLogger::new(dir.path().join("app.log")).unwrap();
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! let db = logger.get_logger("db");
//! warning!(db, "Query took {} ms", 1250);
//! ```

/// Log a message at an explicit severity.
///
/// # Examples
///
/// ```
/// # let dir = tempfile::tempdir().unwrap();
/// # let logger = master_logger::MasterLogger::new(dir.path().join("app.log")).unwrap();
/// use master_logger::{log, Severity};
/// log!(logger, Severity::Info, "Simple message");
/// log!(logger, Severity::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # let dir = tempfile::tempdir().unwrap();
/// # let logger = master_logger::MasterLogger::new(dir.path().join("app.log")).unwrap();
/// use master_logger::warning;
/// warning!(logger, "Disk usage at {}%", 91);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// Records at this level reach the email sink with its default floor.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{MasterLogger, Severity, Sink, LogRecord, Result};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<(Severity, String)>>>);

    impl Sink for Capture {
        fn emit(&mut self, record: &LogRecord) -> Result<()> {
            self.0.lock().push((record.severity(), record.message().to_string()));
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "capture"
        }
    }

    fn logger() -> (tempfile::TempDir, MasterLogger, Capture) {
        let dir = tempfile::tempdir().unwrap();
        let logger = MasterLogger::with_level(dir.path().join("app.log"), Severity::Debug).unwrap();
        let capture = Capture::default();
        logger.add_sink("capture", Box::new(capture.clone()), None);
        (dir, logger, capture)
    }

    #[test]
    fn test_log_macro() {
        let (_dir, logger, capture) = logger();
        log!(logger, Severity::Info, "Test message");
        log!(logger, Severity::Info, "Formatted: {}", 42);

        let records = capture.0.lock();
        assert_eq!(records[0], (Severity::Info, "Test message".to_string()));
        assert_eq!(records[1], (Severity::Info, "Formatted: 42".to_string()));
    }

    #[test]
    fn test_severity_macros() {
        let (_dir, logger, capture) = logger();
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warning!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        critical!(logger, "Critical failure: {}", "system");

        let severities: Vec<Severity> = capture.0.lock().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            severities,
            vec![
                Severity::Debug,
                Severity::Info,
                Severity::Warning,
                Severity::Error,
                Severity::Critical
            ]
        );
        assert_eq!(capture.0.lock()[2].1, "Retry 1 of 3");
    }

    #[test]
    fn test_macros_accept_handles() {
        let (_dir, logger, capture) = logger();
        let handle = logger.get_logger("worker");
        info!(handle, "from {}", "handle");
        assert_eq!(capture.0.lock()[0].1, "from handle");
    }
}
