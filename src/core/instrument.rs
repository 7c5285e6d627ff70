//! Call-boundary instrumentation
//!
//! [`CallInstrumentation`] is configured once and then wraps callables into
//! [`Instrumented`] values. Calling through the wrapper logs one record on
//! entry and one on success or failure; the wrapped function's result, error
//! or panic reaches the caller unchanged.

use super::exception::{panic_message, ExceptionInfo};
use super::logger::LoggerHandle;
use super::record::{CallContext, CallOutcome, SourceLocation};
use super::severity::Severity;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe, Location};

/// Placeholder for values whose `Debug` or `Display` output failed or
/// panicked. A caught panic is still reported by the panic hook.
pub const UNREPRESENTABLE: &str = "<unrepresentable>";

/// Options for wrapping functions with call logging
///
/// Obtained from [`MasterLogger::log_function_call`](crate::MasterLogger::log_function_call)
/// or [`LoggerHandle::log_function_call`].
///
/// # Example
///
/// ```
/// use master_logger::MasterLogger;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = MasterLogger::new(dir.path().join("app.log")).unwrap();
///
/// let add = logger.log_function_call().wrap("add", |(a, b): (i32, i32)| a + b);
/// assert_eq!(add.call((3, 4)), 7);
/// ```
#[derive(Debug, Clone)]
pub struct CallInstrumentation {
    handle: LoggerHandle,
    log_args: bool,
    log_result: bool,
    level: Severity,
}

impl CallInstrumentation {
    pub(crate) fn new(handle: LoggerHandle) -> Self {
        Self {
            handle,
            log_args: true,
            log_result: true,
            level: Severity::Info,
        }
    }

    /// Include a `Debug` snapshot of the arguments in the entry record (default on).
    #[must_use]
    pub fn log_args(mut self, enabled: bool) -> Self {
        self.log_args = enabled;
        self
    }

    /// Include a `Debug` snapshot of the result in the success record (default on).
    #[must_use]
    pub fn log_result(mut self, enabled: bool) -> Self {
        self.log_result = enabled;
        self
    }

    /// Severity of entry and success records (default INFO). Failures are
    /// always logged at ERROR.
    #[must_use]
    pub fn level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Wrap `function` under `name`.
    pub fn wrap<F>(self, name: impl Into<String>, function: F) -> Instrumented<F> {
        Instrumented {
            function,
            name: name.into(),
            options: self,
        }
    }

    fn begin<'a, A: fmt::Debug>(
        &'a self,
        name: &'a str,
        args: &A,
        location: SourceLocation,
    ) -> CallLog<'a> {
        // Skip the snapshot when no record of this call could pass the gate
        let arguments = if self.log_args && self.handle.is_enabled(self.level.min(Severity::Error)) {
            Some(snapshot(args))
        } else {
            None
        };

        let log = CallLog {
            options: self,
            name,
            arguments,
            location,
        };
        log.entered();
        log
    }
}

/// A function wrapped with call logging
///
/// Arguments are passed as one value; use a tuple for several.
pub struct Instrumented<F> {
    function: F,
    name: String,
    options: CallInstrumentation,
}

impl<F> Instrumented<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_inner(self) -> F {
        self.function
    }

    /// Call the wrapped function and return its result.
    ///
    /// A panic inside the function is logged at ERROR and then resumed.
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: fmt::Debug,
        R: fmt::Debug,
    {
        let log = self.options.begin(&self.name, &args, Location::caller().into());
        let result = log.guard(|| (self.function)(args));
        log.finished(&result);
        result
    }

    /// Like [`call`](Self::call) for functions that need `&mut` access to
    /// their captured state.
    #[track_caller]
    pub fn call_mut<A, R>(&mut self, args: A) -> R
    where
        F: FnMut(A) -> R,
        A: fmt::Debug,
        R: fmt::Debug,
    {
        let function = &mut self.function;
        let log = self.options.begin(&self.name, &args, Location::caller().into());
        let result = log.guard(|| function(args));
        log.finished(&result);
        result
    }

    /// Call a fallible function. `Ok` is logged as success; `Err` is logged
    /// once at ERROR with its exception details and returned unchanged.
    #[track_caller]
    pub fn try_call<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: fmt::Debug,
        T: fmt::Debug,
        E: Error + 'static,
    {
        let log = self.options.begin(&self.name, &args, Location::caller().into());
        let result = log.guard(|| (self.function)(args));
        match &result {
            Ok(value) => log.finished(value),
            Err(error) => {
                let exception = ExceptionInfo::capture(error);
                log.failed(&exception.message().to_string(), exception)
            }
        }
        result
    }
}

impl<F> fmt::Debug for Instrumented<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented")
            .field("name", &self.name)
            .field("log_args", &self.options.log_args)
            .field("log_result", &self.options.log_result)
            .field("level", &self.options.level)
            .finish()
    }
}

/// Records of one in-flight call.
struct CallLog<'a> {
    options: &'a CallInstrumentation,
    name: &'a str,
    arguments: Option<String>,
    location: SourceLocation,
}

impl CallLog<'_> {
    fn entered(&self) {
        let level = self.options.level;
        if !self.options.handle.is_enabled(level) {
            return;
        }
        let message = match &self.arguments {
            Some(args) => format!("Calling function {} with arguments: {}", self.name, args),
            None => format!("Calling function {}", self.name),
        };
        self.emit(level, &message, None, CallOutcome::Entered);
    }

    fn guard<R>(&self, function: impl FnOnce() -> R) -> R {
        match catch_unwind(AssertUnwindSafe(function)) {
            Ok(result) => result,
            Err(payload) => {
                let exception = ExceptionInfo::from_panic(payload.as_ref());
                self.failed(&panic_message(payload.as_ref()), exception);
                resume_unwind(payload)
            }
        }
    }

    fn finished<R: fmt::Debug + ?Sized>(&self, result: &R) {
        let level = self.options.level;
        if !self.options.handle.is_enabled(level) {
            return;
        }
        let (message, snapshot) = if self.options.log_result {
            let snapshot = snapshot(result);
            (
                format!("Function {} finished. Result: {}", self.name, snapshot),
                Some(snapshot),
            )
        } else {
            (format!("Function {} finished.", self.name), None)
        };
        self.emit(level, &message, None, CallOutcome::Returned(snapshot));
    }

    fn failed(&self, reason: &str, exception: ExceptionInfo) {
        let message = format!("Function {} failed: {}", self.name, reason);
        self.emit(Severity::Error, &message, Some(exception), CallOutcome::Failed);
    }

    fn emit(&self, severity: Severity, message: &str, exception: Option<ExceptionInfo>, outcome: CallOutcome) {
        let call = CallContext::new(self.name, self.arguments.clone(), outcome);
        self.options
            .handle
            .dispatch_full(severity, message, exception, Some(call), Some(self.location));
    }
}

/// `Debug` rendering of `value`, or [`UNREPRESENTABLE`] when formatting
/// fails or panics.
///
/// A panicking `Debug` is caught here, but the installed panic hook still
/// runs first, so the default hook prints the panic to stderr. Install a
/// quieter hook with `std::panic::set_hook` when that output is unwanted.
pub fn snapshot<T: fmt::Debug + ?Sized>(value: &T) -> String {
    let rendered = catch_unwind(AssertUnwindSafe(|| {
        let mut out = String::new();
        write!(out, "{:?}", value).map(|_| out)
    }));
    match rendered {
        Ok(Ok(text)) => text,
        _ => UNREPRESENTABLE.to_string(),
    }
}
