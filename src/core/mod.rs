//! Core logger types and traits

pub mod config;
pub(crate) mod diagnostics;
pub mod error;
pub(crate) mod exception;
pub mod gate;
pub mod instrument;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod record;
pub mod router;
pub mod severity;
pub mod sink;
pub mod template;
pub mod timestamp;

pub use config::{
    ConsoleLoggingConfig, ConsoleStream, EmailLoggingConfig, FileLoggingConfig, LoggerConfig,
};
pub use diagnostics::{FailureReporter, REPORT_EVERY};
pub use error::{LoggerError, Result};
pub use exception::{ExceptionInfo, StackFrame};
pub use gate::{LevelOverride, SeverityGate};
pub use instrument::{snapshot, CallInstrumentation, Instrumented, UNREPRESENTABLE};
pub use logger::{
    LoggerHandle, MasterLogger, MasterLoggerBuilder, CONSOLE_SINK, EMAIL_SINK, FILE_SINK,
};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use overflow_policy::OverflowPolicy;
pub use record::{CallContext, CallOutcome, LogRecord, SourceLocation};
pub use router::Router;
pub use severity::{IntoSeverity, Severity};
pub use sink::Sink;
pub use template::{render, RecordFactory};
pub use timestamp::TimestampFormat;
