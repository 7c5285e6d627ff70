//! Structured capture of errors and panics for log records
//!
//! Rust has no ambient "current exception", so capture always takes the
//! caught value explicitly: an error reference via [`ExceptionInfo::capture`]
//! or a panic payload via [`ExceptionInfo::from_panic`].

use super::instrument::UNREPRESENTABLE;
use super::record::sanitize_line;
use super::template::display;
use serde::Serialize;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::panic::Location;

/// One frame of a captured trace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// Type, message, cause chain and frame trace of a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    type_name: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<String>,
    frames: Vec<StackFrame>,
}

impl ExceptionInfo {
    /// Build exception info from explicit parts, without a trace.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Exception info carrying nothing, used when no failure was supplied.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture an error value together with the current stack trace.
    ///
    /// The type name is the last path segment of `E`, the message is the
    /// error's `Display` output and every `source()` in the chain becomes a
    /// cause. Line breaks in the message and causes are escaped.
    #[track_caller]
    pub fn capture<E>(error: &E) -> Self
    where
        E: Error + ?Sized + 'static,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(describe(cause));
            source = cause.source();
        }

        Self {
            type_name: short_type_name(std::any::type_name::<E>()),
            message: describe(error),
            causes,
            frames: capture_frames(Location::caller()),
        }
    }

    /// Capture a panic payload as returned by `std::panic::catch_unwind`.
    #[track_caller]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self {
            type_name: "panic".to_string(),
            message: sanitize_line(&panic_message(payload)),
            causes: Vec::new(),
            frames: capture_frames(Location::caller()),
        }
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty() && self.message.is_empty() && self.frames.is_empty()
    }

    /// Multi-line traceback block appended below a text log line.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("Traceback (most recent call first):");
        for frame in &self.frames {
            out.push_str("\n  at ");
            out.push_str(&frame.to_string());
        }
        out.push('\n');
        out.push_str(&self.to_string());
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        out
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

fn describe<E: Error + ?Sized>(error: &E) -> String {
    sanitize_line(&display(&error).unwrap_or_else(|| UNREPRESENTABLE.to_string()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// `core::num::error::ParseIntError` -> `ParseIntError`,
/// `alloc::vec::Vec<u8>` -> `Vec`.
pub(crate) fn short_type_name(full: &str) -> String {
    let full = full.trim_start_matches("dyn ");
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).trim().to_string()
}

fn capture_frames(caller: &Location<'_>) -> Vec<StackFrame> {
    let backtrace = Backtrace::force_capture();
    let mut frames = match backtrace.status() {
        BacktraceStatus::Captured => parse_backtrace(&backtrace.to_string()),
        _ => Vec::new(),
    };
    if frames.is_empty() {
        frames.push(StackFrame::new(caller.file(), caller.line(), "<unknown>"));
    }
    frames
}

/// Parse the `Display` output of a std backtrace:
///
/// ```text
///    0: crate::module::function
///              at ./src/module.rs:10:5
/// ```
///
/// Frames belonging to the capture machinery itself are dropped.
pub(crate) fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line_no) = split_location(location);
                frame.file = file;
                frame.line = line_no;
            }
            continue;
        }

        let function = match trimmed.split_once(": ") {
            Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => trimmed,
        };
        frames.push(StackFrame::new("<unknown>", 0, function));
    }

    let own_module = concat!(module_path!(), "::");
    frames.retain(|frame| {
        !(frame.function.starts_with("std::backtrace")
            || frame.function.starts_with("<std::backtrace")
            || frame.function.contains(own_module))
    });
    frames
}

fn split_location(location: &str) -> (String, u32) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    let file = parts.next();

    match (file, line.and_then(|l| l.parse().ok()), column) {
        (Some(file), Some(line), Some(_)) => (file.to_string(), line),
        _ => (location.to_string(), 0),
    }
}
