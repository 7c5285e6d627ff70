//! # Master Logger
//!
//! One logging facade that fans records out to a size-rotated log file, a
//! colored console and email alerts for critical failures.
//!
//! ## Features
//!
//! - **Severity Gate**: a shared threshold with scoped per-thread overrides
//! - **Isolated Sinks**: a failing sink never stops the others or the caller
//! - **Exceptions**: error chains and panics rendered with their frames
//! - **Call Instrumentation**: wrap functions to log entry, result and failure
//!
//! ```
//! use master_logger::{MasterLogger, Severity};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let logger = MasterLogger::with_level(dir.path().join("app.log"), Severity::Info).unwrap();
//!
//! logger.info("service started");
//!
//! let parse = logger
//!     .log_function_call()
//!     .wrap("parse", |s: &str| s.parse::<u32>());
//! assert!(parse.try_call("42").is_ok());
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        CallInstrumentation, ConsoleLoggingConfig, EmailLoggingConfig, ExceptionInfo,
        FileLoggingConfig, IntoSeverity, LoggerConfig, LoggerError, LoggerHandle, MasterLogger,
        OutputFormat, Result, Severity, Sink, TimestampFormat,
    };
    pub use crate::sinks::{ColorMode, ConsoleSink, RotatingFileSink};
}

pub use crate::core::{
    CallContext, CallInstrumentation, CallOutcome, ConsoleLoggingConfig, ConsoleStream,
    EmailLoggingConfig, ExceptionInfo, FileLoggingConfig, Instrumented, IntoSeverity,
    LevelOverride, LogRecord, LoggerConfig, LoggerError, LoggerHandle, LoggerMetrics,
    MasterLogger, MasterLoggerBuilder, OutputFormat, OverflowPolicy, RecordFactory, Result,
    Severity, SeverityGate, Sink, SourceLocation, StackFrame, TimestampFormat,
};
pub use crate::sinks::{
    BackgroundSink, ColorMode, ConsoleSink, ConsoleTarget, EmailSink, MailTransport,
    RotatingFileSink, RotationPolicy, SmtpSecurity, SmtpTransport,
};
