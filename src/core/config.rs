//! Declarative logger configuration
//!
//! Every struct deserializes with `serde`, so a whole logger can be described
//! in JSON (or any serde format the application reads) and applied with
//! [`MasterLogger::from_config`](crate::MasterLogger::from_config). Durations
//! are given in seconds.
//!
//! ```
//! use master_logger::LoggerConfig;
//!
//! let config: LoggerConfig = serde_json::from_str(r#"{
//!     "name": "billing",
//!     "level": "DEBUG",
//!     "file": { "path": "logs/billing.log", "max_bytes": 1048576, "backup_count": 3 },
//!     "console": { "colors": "never" }
//! }"#).unwrap();
//!
//! assert_eq!(config.file.backup_count, 3);
//! assert!(config.email.is_none());
//! ```

use super::error::{LoggerError, Result};
use super::output_format::OutputFormat;
use super::severity::Severity;
use super::timestamp::TimestampFormat;
use crate::sinks::email::DEFAULT_SUBJECT_PREFIX;
use crate::sinks::rotating_file::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};
use crate::sinks::{ColorMode, ConsoleTarget, RotationPolicy, RotationTrigger, DEFAULT_QUEUE_CAPACITY};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

fn default_name() -> String {
    "root".to_string()
}

/// Complete logger description
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub level: Severity,
    pub file: FileLoggingConfig,
    #[serde(default)]
    pub console: Option<ConsoleLoggingConfig>,
    #[serde(default)]
    pub email: Option<EmailLoggingConfig>,
}

impl LoggerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: default_name(),
            level: Severity::default(),
            file: FileLoggingConfig::new(path),
            console: None,
            email: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] for the first invalid section
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::config("logger", "name must not be empty"));
        }
        self.file.validate()?;
        if let Some(email) = &self.email {
            email.validate()?;
        }
        Ok(())
    }
}

/// Rotating file output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingConfig {
    pub path: PathBuf,
    #[serde(default = "FileLoggingConfig::default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "FileLoggingConfig::default_backup_count")]
    pub backup_count: usize,
    /// Also rotate once the file is this many seconds old
    #[serde(default)]
    pub rotation_interval_secs: Option<u64>,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
    /// Minimum severity for this sink on top of the logger's level
    #[serde(default)]
    pub level: Option<Severity>,
}

impl FileLoggingConfig {
    fn default_max_bytes() -> u64 {
        DEFAULT_MAX_BYTES
    }

    fn default_backup_count() -> usize {
        DEFAULT_BACKUP_COUNT
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
            rotation_interval_secs: None,
            compress: false,
            format: OutputFormat::default(),
            timestamp_format: TimestampFormat::default(),
            level: None,
        }
    }

    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use]
    pub fn rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval_secs = Some(interval.as_secs().max(1));
        self
    }

    #[must_use]
    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] for an empty path or a
    /// zero size or interval
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(LoggerError::config("file", "path must not be empty"));
        }
        if self.max_bytes == 0 {
            return Err(LoggerError::config("file", "max_bytes must be greater than zero"));
        }
        if self.rotation_interval_secs == Some(0) {
            return Err(LoggerError::config("file", "rotation_interval_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Size trigger, combined with a time trigger when an interval is set.
    pub fn rotation_policy(&self) -> RotationPolicy {
        let trigger = match self.rotation_interval_secs {
            Some(secs) => RotationTrigger::hybrid(self.max_bytes, Duration::from_secs(secs)),
            None => RotationTrigger::size(self.max_bytes),
        };
        RotationPolicy::new()
            .with_trigger(trigger)
            .with_backup_count(self.backup_count)
            .with_compression(self.compress)
    }
}

/// Standard stream used by the console sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
    /// ERROR and CRITICAL to stderr, the rest to stdout
    Split,
}

impl From<ConsoleStream> for ConsoleTarget {
    fn from(stream: ConsoleStream) -> Self {
        match stream {
            ConsoleStream::Stdout => ConsoleTarget::Stdout,
            ConsoleStream::Stderr => ConsoleTarget::Stderr,
            ConsoleStream::Split => ConsoleTarget::Split,
        }
    }
}

/// Colored terminal output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleLoggingConfig {
    pub stream: ConsoleStream,
    pub colors: ColorMode,
    pub format: OutputFormat,
    pub timestamp_format: TimestampFormat,
    pub level: Option<Severity>,
}

impl ConsoleLoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stream(mut self, stream: ConsoleStream) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn colors(mut self, mode: ColorMode) -> Self {
        self.colors = mode;
        self
    }

    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }
}

/// Email alerts over SMTP
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailLoggingConfig {
    pub smtp_server: String,
    #[serde(default = "EmailLoggingConfig::default_port")]
    pub port: u16,
    pub sender: String,
    /// Login password; no `AUTH` is attempted without one
    #[serde(default)]
    pub password: Option<String>,
    /// Login name, the sender address when unset
    #[serde(default)]
    pub username: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default = "EmailLoggingConfig::default_subject_prefix")]
    pub subject_prefix: String,
    /// Minimum severity that triggers a mail
    #[serde(default = "EmailLoggingConfig::default_level")]
    pub level: Severity,
    #[serde(default = "EmailLoggingConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upgrade the session with `STARTTLS` before logging in
    #[serde(default = "EmailLoggingConfig::default_true")]
    pub starttls: bool,
    /// Allow `AUTH` without TLS when `starttls` is off
    #[serde(default)]
    pub allow_plaintext_auth: bool,
    /// Connect and log in once during setup, failing setup when that fails
    #[serde(default = "EmailLoggingConfig::default_true")]
    pub verify_on_setup: bool,
    /// Deliver from a worker thread instead of the logging thread
    #[serde(default = "EmailLoggingConfig::default_true")]
    pub background: bool,
    #[serde(default = "EmailLoggingConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl EmailLoggingConfig {
    fn default_port() -> u16 {
        25
    }

    fn default_subject_prefix() -> String {
        DEFAULT_SUBJECT_PREFIX.to_string()
    }

    fn default_level() -> Severity {
        Severity::Critical
    }

    fn default_timeout_secs() -> u64 {
        10
    }

    fn default_true() -> bool {
        true
    }

    fn default_queue_capacity() -> usize {
        DEFAULT_QUEUE_CAPACITY
    }

    pub fn new(
        smtp_server: impl Into<String>,
        port: u16,
        sender: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            smtp_server: smtp_server.into(),
            port,
            sender: sender.into(),
            password: None,
            username: None,
            recipients,
            subject_prefix: Self::default_subject_prefix(),
            level: Self::default_level(),
            timeout_secs: Self::default_timeout_secs(),
            starttls: true,
            allow_plaintext_auth: false,
            verify_on_setup: true,
            background: true,
            queue_capacity: Self::default_queue_capacity(),
        }
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn starttls(mut self, enabled: bool) -> Self {
        self.starttls = enabled;
        self
    }

    #[must_use]
    pub fn allow_plaintext_auth(mut self, allowed: bool) -> Self {
        self.allow_plaintext_auth = allowed;
        self
    }

    #[must_use]
    pub fn verify_on_setup(mut self, enabled: bool) -> Self {
        self.verify_on_setup = enabled;
        self
    }

    #[must_use]
    pub fn background(mut self, enabled: bool) -> Self {
        self.background = enabled;
        self
    }

    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Checks the server settings. Addresses are checked by the sink itself.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] for an empty server name,
    /// port 0, a zero timeout, or a zero queue capacity with background delivery
    pub fn validate(&self) -> Result<()> {
        if self.smtp_server.trim().is_empty() {
            return Err(LoggerError::config("email", "smtp_server must not be empty"));
        }
        if self.port == 0 {
            return Err(LoggerError::config("email", "port must not be 0"));
        }
        if self.timeout_secs == 0 {
            return Err(LoggerError::config("email", "timeout_secs must be greater than zero"));
        }
        if self.background && self.queue_capacity == 0 {
            return Err(LoggerError::config("email", "queue_capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
