//! Immutable log record handed to every sink

use super::exception::ExceptionInfo;
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::panic::Location;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Source position of the logging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

/// Where an instrumented call stood when the record was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "result", rename_all = "snake_case")]
pub enum CallOutcome {
    Entered,
    /// Result snapshot, `None` when result logging is disabled.
    Returned(Option<String>),
    Failed,
}

/// Call-boundary details attached by call instrumentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallContext {
    pub function: String,
    /// Argument snapshot, `None` when argument logging is disabled.
    pub arguments: Option<String>,
    pub outcome: CallOutcome,
}

impl CallContext {
    pub fn new(function: impl Into<String>, arguments: Option<String>, outcome: CallOutcome) -> Self {
        Self {
            function: function.into(),
            arguments,
            outcome,
        }
    }
}

/// One logging event.
///
/// Records are only constructed inside the crate (see
/// [`RecordFactory`](crate::core::RecordFactory)) and sinks receive them by
/// shared reference, so a record never changes after it is built.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    severity: Severity,
    logger_name: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call: Option<CallContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<SourceLocation>,
    thread_id: String,
    thread_name: Option<String>,
}

/// Replaces newlines, carriage returns, and tabs with escape sequences
/// so one record can never be read back as several log lines.
pub(crate) fn sanitize_line(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

impl LogRecord {
    pub(crate) fn new(severity: Severity, logger_name: &str, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            logger_name: logger_name.to_string(),
            message: sanitize_line(message),
            exception: None,
            call: None,
            location: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
        }
    }

    pub(crate) fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub(crate) fn with_call(mut self, call: CallContext) -> Self {
        self.call = Some(call);
        self
    }

    pub(crate) fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn call(&self) -> Option<&CallContext> {
        self.call.as_ref()
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }
}

impl fmt::Display for LogRecord {
    /// `[SEVERITY] [logger_name] message`, without timestamp.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}] {}", self.severity, self.logger_name, self.message)
    }
}
