//! The logging facade
//!
//! [`MasterLogger`] owns the severity gate and the sink registry. It logs
//! under its own name and hands out [`LoggerHandle`]s that share both, so
//! every part of an application routes through the same sinks and threshold.

use super::{
    config::{ConsoleLoggingConfig, EmailLoggingConfig, FileLoggingConfig, LoggerConfig},
    diagnostics::FailureReporter,
    error::{LoggerError, Result},
    exception::ExceptionInfo,
    gate::{LevelOverride, SeverityGate},
    instrument::CallInstrumentation,
    metrics::LoggerMetrics,
    output_format::OutputFormat,
    overflow_policy::OverflowPolicy,
    record::{CallContext, SourceLocation},
    router::Router,
    severity::{IntoSeverity, Severity},
    sink::Sink,
    template::RecordFactory,
    timestamp::TimestampFormat,
};
use crate::sinks::{
    BackgroundSink, ConsoleSink, EmailSink, MailTransport, RotatingFileSink, SmtpSecurity,
    SmtpTransport,
};
use std::error::Error;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sink id of the rotating file sink.
pub const FILE_SINK: &str = "file";
/// Sink id of the console sink.
pub const CONSOLE_SINK: &str = "console";
/// Sink id of the email sink.
pub const EMAIL_SINK: &str = "email";

/// Named, cloneable front end to a logger's gate and sinks
///
/// Handles are cheap to clone and can be sent to other threads. Every handle
/// obtained from one [`MasterLogger`] shares its threshold, overrides and
/// sinks; only the logger name stamped on records differs.
#[derive(Clone)]
pub struct LoggerHandle {
    router: Arc<Router>,
    name: Arc<str>,
}

impl LoggerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a record of `severity` would currently be routed.
    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.router.accepts(severity)
    }

    /// Effective threshold for the calling thread
    pub fn level(&self) -> Severity {
        self.router.gate().current_level()
    }

    #[track_caller]
    pub fn log(&self, level: Severity, message: impl AsRef<str>) {
        self.dispatch_full(level, message.as_ref(), None, None, Some(Location::caller().into()));
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Severity::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Severity::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(Severity::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Severity::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Severity::Critical, message);
    }

    /// Log `template` rendered with `args` (`{}`, `{0}`, `{{`, `}}`).
    ///
    /// A template that does not match its arguments is logged as is, with a
    /// `[formatting error: ...]` note.
    #[track_caller]
    pub fn log_template(&self, level: Severity, template: &str, args: &[&dyn fmt::Display]) {
        if !self.admit(level) {
            return;
        }
        let record = RecordFactory::build(&self.name, level, template, args)
            .with_location(Location::caller().into());
        self.router.dispatch(&record);
    }

    /// Log `message` at ERROR together with the details of `error`.
    #[track_caller]
    pub fn log_exception<E>(&self, message: impl AsRef<str>, error: &E)
    where
        E: Error + ?Sized + 'static,
    {
        if !self.admit(Severity::Error) {
            return;
        }
        let exception = ExceptionInfo::capture(error);
        self.dispatch_admitted(
            Severity::Error,
            message.as_ref(),
            Some(exception),
            None,
            Some(Location::caller().into()),
        );
    }

    /// Log `message` at `level` with already captured exception details.
    ///
    /// Passing `None` still logs: the record carries empty exception details
    /// and the message is marked `[no active exception]`.
    #[track_caller]
    pub fn log_exception_at(
        &self,
        level: Severity,
        message: impl AsRef<str>,
        exception: Option<ExceptionInfo>,
    ) {
        let location = Some(Location::caller().into());
        match exception {
            Some(exception) => {
                self.dispatch_full(level, message.as_ref(), Some(exception), None, location)
            }
            None => {
                let message = format!("{} [no active exception]", message.as_ref());
                self.dispatch_full(level, &message, Some(ExceptionInfo::empty()), None, location)
            }
        }
    }

    /// Start configuring call instrumentation that logs through this handle.
    pub fn log_function_call(&self) -> CallInstrumentation {
        CallInstrumentation::new(self.clone())
    }

    /// Override the threshold for the calling thread until the guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level; nothing
    /// is changed in that case.
    pub fn temporary_log_level(&self, level: impl IntoSeverity) -> Result<LevelOverride> {
        self.router.gate().push_override(level)
    }

    /// Run `f` with the threshold overridden on the calling thread.
    ///
    /// The previous level is restored when `f` returns or panics.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level, without
    /// running `f`.
    pub fn with_log_level<R>(&self, level: impl IntoSeverity, f: impl FnOnce() -> R) -> Result<R> {
        let _guard = self.temporary_log_level(level)?;
        Ok(f())
    }

    pub(crate) fn dispatch_full(
        &self,
        severity: Severity,
        message: &str,
        exception: Option<ExceptionInfo>,
        call: Option<CallContext>,
        location: Option<SourceLocation>,
    ) {
        if self.admit(severity) {
            self.dispatch_admitted(severity, message, exception, call, location);
        }
    }

    fn dispatch_admitted(
        &self,
        severity: Severity,
        message: &str,
        exception: Option<ExceptionInfo>,
        call: Option<CallContext>,
        location: Option<SourceLocation>,
    ) {
        let record = RecordFactory::build_full(&self.name, severity, message, exception, call, location);
        self.router.dispatch(&record);
    }

    /// Gate check before any record is built.
    #[inline]
    fn admit(&self, severity: Severity) -> bool {
        if self.router.accepts(severity) {
            true
        } else {
            self.router.metrics().record_filtered();
            false
        }
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish()
    }
}

/// Builder for [`MasterLogger`]
///
/// # Example
///
/// ```
/// use master_logger::{MasterLogger, OutputFormat, Severity};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = MasterLogger::builder(dir.path().join("app.log"))
///     .name("billing")
///     .level(Severity::Debug)
///     .max_bytes(1024 * 1024)
///     .backup_count(3)
///     .file_format(OutputFormat::Json)
///     .build()
///     .unwrap();
///
/// assert_eq!(logger.name(), "billing");
/// ```
#[must_use = "builders do nothing until build() is called"]
pub struct MasterLoggerBuilder {
    file: FileLoggingConfig,
    name: String,
    level: Result<Severity>,
    diagnostics: Option<Box<dyn Write + Send>>,
}

impl MasterLoggerBuilder {
    fn new(path: PathBuf) -> Self {
        Self {
            file: FileLoggingConfig::new(path),
            name: "root".to_string(),
            level: Ok(Severity::Info),
            diagnostics: None,
        }
    }

    /// Name stamped on records logged through the logger itself (default `root`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Base threshold (default INFO). An unknown level fails in `build()`.
    pub fn level(mut self, level: impl IntoSeverity) -> Self {
        self.level = level.into_severity();
        self
    }

    /// Size limit of the active log file (default 100 MiB)
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.file.max_bytes = max_bytes;
        self
    }

    /// Rotated files kept (default 5)
    pub fn backup_count(mut self, count: usize) -> Self {
        self.file.backup_count = count;
        self
    }

    /// Also rotate once the file reaches this age
    pub fn rotation_interval(mut self, interval: Duration) -> Self {
        self.file = self.file.rotation_interval(interval);
        self
    }

    pub fn compress_backups(mut self, enabled: bool) -> Self {
        self.file.compress = enabled;
        self
    }

    pub fn file_format(mut self, format: OutputFormat) -> Self {
        self.file.format = format;
        self
    }

    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.file.timestamp_format = format;
        self
    }

    /// Where the logger writes its own `[LOGGER ERROR]` diagnostics (default stderr)
    pub fn diagnostics_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.diagnostics = Some(writer);
        self
    }

    /// Create the logger and its rotating file sink.
    ///
    /// # Errors
    ///
    /// Returns error for an unknown level, an invalid file configuration, or
    /// a log file that cannot be created
    pub fn build(self) -> Result<MasterLogger> {
        let level = self.level?;
        if self.name.trim().is_empty() {
            return Err(LoggerError::config("logger", "name must not be empty"));
        }

        let metrics = Arc::new(LoggerMetrics::new());
        let reporter = Arc::new(match self.diagnostics {
            Some(writer) => FailureReporter::with_writer(writer, Arc::clone(&metrics)),
            None => FailureReporter::stderr(Arc::clone(&metrics)),
        });
        let router = Arc::new(Router::new(
            Arc::new(SeverityGate::new(level)),
            metrics,
            reporter,
        ));

        let logger = MasterLogger {
            handle: LoggerHandle {
                router,
                name: Arc::from(self.name),
            },
            file_path: self.file.path.clone(),
            closed: AtomicBool::new(false),
        };
        logger.setup_file_logging(self.file)?;
        Ok(logger)
    }
}

/// Logging facade fanning records out to file, console and email sinks
///
/// # Example
///
/// ```
/// use master_logger::MasterLogger;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = MasterLogger::with_level(dir.path().join("app.log"), "INFO").unwrap();
///
/// logger.debug("not written");
/// logger.info("written");
///
/// {
///     let _debug = logger.temporary_log_level("DEBUG").unwrap();
///     logger.debug("written while the override is alive");
/// }
///
/// let db = logger.get_logger("db");
/// db.warning("slow query");
/// ```
pub struct MasterLogger {
    handle: LoggerHandle,
    file_path: PathBuf,
    closed: AtomicBool,
}

impl MasterLogger {
    /// Logger writing to `path` at INFO with default rotation.
    ///
    /// # Errors
    ///
    /// Returns error if the log file or its directory cannot be created
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder(path).build()
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level, or an
    /// error if the log file cannot be created
    pub fn with_level(path: impl AsRef<Path>, level: impl IntoSeverity) -> Result<Self> {
        Self::builder(path).level(level).build()
    }

    pub fn builder(path: impl AsRef<Path>) -> MasterLoggerBuilder {
        MasterLoggerBuilder::new(path.as_ref().to_path_buf())
    }

    /// Build a logger and every sink described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or setup error
    pub fn from_config(config: LoggerConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder(&config.file.path)
            .name(config.name)
            .level(config.level);
        builder.file = config.file;
        let logger = builder.build()?;

        if let Some(console) = config.console {
            logger.setup_colored_console_logging(console)?;
        }
        if let Some(email) = config.email {
            logger.setup_email_logging(email)?;
        }
        Ok(logger)
    }

    /// Register (or reconfigure) the rotating file sink.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid settings or
    /// a path whose file or directory cannot be created; the I/O failure is
    /// kept as the error's source
    pub fn setup_file_logging(&self, config: FileLoggingConfig) -> Result<()> {
        config.validate()?;
        let sink = RotatingFileSink::with_policy(&config.path, config.rotation_policy())
            .map_err(|e| LoggerError::setup_failed("file", e))?
            .with_output_format(config.format)
            .with_timestamp_format(config.timestamp_format.clone())
            .with_reporter(Arc::clone(self.router().reporter()));
        self.register(FILE_SINK, Box::new(sink), config.level);
        Ok(())
    }

    /// Register (or reconfigure) the colored console sink.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible like the other setup calls
    pub fn setup_colored_console_logging(&self, config: ConsoleLoggingConfig) -> Result<()> {
        let sink = ConsoleSink::new()
            .with_target(config.stream.into())
            .with_color_mode(config.colors)
            .with_output_format(config.format)
            .with_timestamp_format(config.timestamp_format);
        self.register(CONSOLE_SINK, Box::new(sink), config.level);
        Ok(())
    }

    /// Register (or reconfigure) the email sink using SMTP.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid settings, or
    /// when `verify_on_setup` is set (the default) and the server cannot be
    /// reached, refuses `STARTTLS` or rejects the login. The transport
    /// failure is kept as the error's source.
    pub fn setup_email_logging(&self, config: EmailLoggingConfig) -> Result<()> {
        config.validate()?;
        let security = if config.starttls {
            SmtpSecurity::StartTls
        } else {
            SmtpSecurity::None
        };
        let mut transport = SmtpTransport::new(&config.smtp_server, config.port)
            .with_timeout(config.timeout_duration())
            .with_security(security)
            .allow_plaintext_auth(config.allow_plaintext_auth);
        if let Some(password) = &config.password {
            let username = config.username.as_deref().unwrap_or(&config.sender);
            transport = transport.with_credentials(username, password);
        }
        self.setup_email_logging_with_transport(config, Box::new(transport))
    }

    /// Register (or reconfigure) the email sink with a custom transport.
    ///
    /// # Errors
    ///
    /// See [`setup_email_logging`](Self::setup_email_logging)
    pub fn setup_email_logging_with_transport(
        &self,
        config: EmailLoggingConfig,
        transport: Box<dyn MailTransport>,
    ) -> Result<()> {
        config.validate()?;
        let mut sink = EmailSink::new(transport, &config.sender, config.recipients.clone())?
            .with_subject_prefix(&config.subject_prefix);
        if config.verify_on_setup {
            sink.verify().map_err(|e| LoggerError::setup_failed("email", e))?;
        }

        let sink: Box<dyn Sink> = if config.background {
            Box::new(BackgroundSink::spawn_with_reporter(
                Box::new(sink),
                config.queue_capacity,
                OverflowPolicy::default(),
                Arc::clone(self.router().reporter()),
            )?)
        } else {
            Box::new(sink)
        };
        self.register(EMAIL_SINK, sink, Some(config.level));
        Ok(())
    }

    /// Register a custom sink under `id`, replacing any sink with that id.
    ///
    /// `floor` is the sink's own minimum severity on top of the logger's level.
    pub fn add_sink(&self, id: impl Into<String>, sink: Box<dyn Sink>, floor: Option<Severity>) {
        self.register(id, sink, floor);
    }

    fn register(&self, id: impl Into<String>, sink: Box<dyn Sink>, floor: Option<Severity>) {
        // The replaced sink flushes and closes as it drops
        drop(self.router().register(id, sink, floor));
    }

    /// Handle logging under `name` through this logger's gate and sinks.
    pub fn get_logger(&self, name: impl AsRef<str>) -> LoggerHandle {
        LoggerHandle {
            router: Arc::clone(&self.handle.router),
            name: Arc::from(name.as_ref()),
        }
    }

    /// The logger's own handle
    pub fn handle(&self) -> &LoggerHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Change the base threshold for all threads.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level
    pub fn set_level(&self, level: impl IntoSeverity) -> Result<()> {
        self.router().gate().set_base_level(level.into_severity()?);
        Ok(())
    }

    /// Base threshold, ignoring overrides
    pub fn level(&self) -> Severity {
        self.router().gate().base_level()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        self.router().metrics()
    }

    /// Registered sink ids in dispatch order
    pub fn sink_ids(&self) -> Vec<String> {
        self.router().sink_ids()
    }

    /// Flush every sink, waiting for background sinks to drain.
    ///
    /// # Errors
    ///
    /// Returns the first flush error after trying all sinks
    pub fn flush(&self) -> Result<()> {
        self.router().flush()
    }

    /// Flush and release every sink. Later records go nowhere.
    ///
    /// Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first flush error after trying all sinks
    pub fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.router().close()
    }

    fn router(&self) -> &Arc<Router> {
        &self.handle.router
    }

    #[track_caller]
    pub fn log(&self, level: Severity, message: impl AsRef<str>) {
        self.handle.log(level, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.handle.debug(message);
    }

    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.handle.info(message);
    }

    #[track_caller]
    pub fn warning(&self, message: impl AsRef<str>) {
        self.handle.warning(message);
    }

    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.handle.error(message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.handle.critical(message);
    }

    #[track_caller]
    pub fn log_template(&self, level: Severity, template: &str, args: &[&dyn fmt::Display]) {
        self.handle.log_template(level, template, args);
    }

    /// See [`LoggerHandle::log_exception`].
    #[track_caller]
    pub fn log_exception<E>(&self, message: impl AsRef<str>, error: &E)
    where
        E: Error + ?Sized + 'static,
    {
        self.handle.log_exception(message, error);
    }

    /// See [`LoggerHandle::log_exception_at`].
    #[track_caller]
    pub fn log_exception_at(
        &self,
        level: Severity,
        message: impl AsRef<str>,
        exception: Option<ExceptionInfo>,
    ) {
        self.handle.log_exception_at(level, message, exception);
    }

    pub fn log_function_call(&self) -> CallInstrumentation {
        self.handle.log_function_call()
    }

    /// See [`LoggerHandle::temporary_log_level`].
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level
    pub fn temporary_log_level(&self, level: impl IntoSeverity) -> Result<LevelOverride> {
        self.handle.temporary_log_level(level)
    }

    /// See [`LoggerHandle::with_log_level`].
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for an unknown level
    pub fn with_log_level<R>(&self, level: impl IntoSeverity, f: impl FnOnce() -> R) -> Result<R> {
        self.handle.with_log_level(level, f)
    }

    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.handle.is_enabled(severity)
    }
}

impl Drop for MasterLogger {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            self.router()
                .reporter()
                .warning(format_args!("Failed to flush during shutdown: {}", e));
        }
    }
}

impl fmt::Debug for MasterLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterLogger")
            .field("name", &self.name())
            .field("file", &self.file_path)
            .field("router", self.router())
            .finish()
    }
}
