//! Rotating file sink
//!
//! Writes formatted records to a file and rotates it by size, by age, or by
//! whichever limit is reached first. Backups are named `<file>.1` (newest)
//! through `<file>.<backup_count>`, with `.gz` appended when compression is on.

use crate::core::diagnostics::FailureReporter;
use crate::core::error::{LoggerError, Result};
use crate::core::{LogRecord, OutputFormat, Sink, TimestampFormat};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Default size limit of the active file: 100 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Default number of rotated files kept.
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// When to rotate the active file
///
/// # Examples
///
/// ```
/// use master_logger::sinks::RotationTrigger;
/// use std::time::Duration;
///
/// // Rotate before the file would exceed 100 MB
/// let size = RotationTrigger::size(100 * 1024 * 1024);
///
/// // Rotate on size OR age, whichever comes first
/// let hybrid = RotationTrigger::hybrid(50 * 1024 * 1024, Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationTrigger {
    /// Rotate when the next write would push the file past `max_bytes`
    Size { max_bytes: u64 },

    /// Rotate once the current file is older than `interval`
    Time { interval: Duration },

    /// Rotate on size OR time, whichever comes first
    Hybrid { max_bytes: u64, interval: Duration },

    /// No rotation (external rotation, or tests)
    Never,
}

impl Default for RotationTrigger {
    fn default() -> Self {
        RotationTrigger::Size {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl RotationTrigger {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationTrigger::Size { max_bytes }
    }

    #[must_use]
    pub fn time(interval: Duration) -> Self {
        RotationTrigger::Time { interval }
    }

    #[must_use]
    pub fn hybrid(max_bytes: u64, interval: Duration) -> Self {
        RotationTrigger::Hybrid { max_bytes, interval }
    }

    /// Size limit, if this trigger has one
    #[must_use]
    pub fn max_bytes(&self) -> Option<u64> {
        match self {
            RotationTrigger::Size { max_bytes } | RotationTrigger::Hybrid { max_bytes, .. } => {
                Some(*max_bytes)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        match self {
            RotationTrigger::Time { interval } | RotationTrigger::Hybrid { interval, .. } => {
                Some(*interval)
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_bytes() == Some(0) {
            return Err(LoggerError::config("file", "max_bytes must be greater than zero"));
        }
        if self.interval() == Some(Duration::ZERO) {
            return Err(LoggerError::config("file", "rotation interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Rotation settings of a [`RotatingFileSink`]
///
/// # Examples
///
/// ```
/// use master_logger::sinks::{RotationPolicy, RotationTrigger};
///
/// let policy = RotationPolicy::new()
///     .with_trigger(RotationTrigger::size(50 * 1024 * 1024))
///     .with_backup_count(7)
///     .with_compression(true);
/// assert_eq!(policy.backup_count, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub trigger: RotationTrigger,
    /// Rotated files kept; `0` truncates the active file instead of keeping backups
    pub backup_count: usize,
    /// Gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            trigger: RotationTrigger::default(),
            backup_count: DEFAULT_BACKUP_COUNT,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_trigger(mut self, trigger: RotationTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Shorthand for `with_trigger(RotationTrigger::size(max_bytes))`
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.trigger = RotationTrigger::Size { max_bytes };
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// File sink with automatic rotation
///
/// # Examples
///
/// ```no_run
/// use master_logger::sinks::{RotatingFileSink, RotationPolicy};
///
/// let sink = RotatingFileSink::with_policy(
///     "logs/app.log",
///     RotationPolicy::new().with_max_bytes(1024 * 1024).with_backup_count(3),
/// )
/// .unwrap();
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Start of the current file's lifetime, for time triggers
    opened_at: SystemTime,
    rotations: u64,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
    auto_flush: bool,
    reporter: Option<Arc<FailureReporter>>,
}

impl RotatingFileSink {
    /// Open `path` for appending with the default policy (100 MiB, 5 backups).
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the policy is invalid, or the directory or file cannot
    /// be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        policy.trigger.validate()?;
        let base_path = path.as_ref().to_path_buf();
        if base_path.file_name().is_none() {
            return Err(LoggerError::config(
                "file",
                format!("'{}' does not name a file", base_path.display()),
            ));
        }

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size, opened_at) = Self::open_append(&base_path)?;

        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            opened_at,
            rotations: 0,
            output_format: OutputFormat::default(),
            timestamp_format: TimestampFormat::default(),
            auto_flush: true,
            reporter: None,
        })
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Flush after every record (default). Turning it off buffers writes
    /// until [`Sink::flush`] or rotation.
    #[must_use]
    pub fn with_auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = enabled;
        self
    }

    /// Send rotation warnings to `reporter` instead of standard error.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<FailureReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Rotations performed since the sink was opened
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Path of backup number `index` as it is named on disk.
    #[must_use]
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let path = self.plain_backup_path(index);
        if self.policy.compress {
            gz_path(&path)
        } else {
            path
        }
    }

    fn plain_backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        let size_exceeded = |max_bytes: u64| {
            self.current_size > 0 && self.current_size + incoming > max_bytes
        };
        let age_exceeded = |interval: Duration| {
            SystemTime::now()
                .duration_since(self.opened_at)
                .unwrap_or(Duration::ZERO)
                >= interval
        };

        match &self.policy.trigger {
            RotationTrigger::Never => false,
            RotationTrigger::Size { max_bytes } => size_exceeded(*max_bytes),
            RotationTrigger::Time { interval } => age_exceeded(*interval),
            RotationTrigger::Hybrid { max_bytes, interval } => {
                size_exceeded(*max_bytes) || age_exceeded(*interval)
            }
        }
    }

    fn rotate(&mut self) -> Result<()> {
        // Release the file handle before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.backup_count == 0 {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.base_path)
                .map_err(|e| {
                    LoggerError::file_rotation(
                        self.base_path.display().to_string(),
                        format!("Failed to truncate log file: {}", e),
                    )
                })?;
            self.install(file);
            return Ok(());
        }

        let oldest = self.backup_path(self.policy.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|e| {
                LoggerError::file_rotation(
                    oldest.display().to_string(),
                    format!("Failed to remove oldest backup: {}", e),
                )
            })?;
        }

        for i in (1..self.policy.backup_count).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                let to = self.backup_path(i + 1);
                fs::rename(&from, &to).map_err(|e| {
                    LoggerError::file_rotation(
                        from.display().to_string(),
                        format!("Failed to shift backup: {}", e),
                    )
                })?;
            }
        }

        let first = self.plain_backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;
            if self.policy.compress {
                compress_file(&first)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                )
            })?;
        self.install(file);
        Ok(())
    }

    fn install(&mut self, file: File) {
        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.opened_at = SystemTime::now();
        self.rotations += 1;
    }

    /// Keep writing to the current file when rotation fails.
    fn recover(&mut self, error: &LoggerError) -> Result<()> {
        self.warn(format_args!(
            "Log rotation failed: {}. Continuing with current file.",
            error
        ));

        if self.writer.is_none() {
            let (file, size, opened_at) = Self::open_append(&self.base_path)?;
            self.writer = Some(BufWriter::new(file));
            self.current_size = size;
            self.opened_at = opened_at;
        }

        // Let the file grow past the limit rather than retry on every write
        self.current_size = 0;
        self.opened_at = SystemTime::now();
        Ok(())
    }

    fn warn(&self, message: std::fmt::Arguments<'_>) {
        match &self.reporter {
            Some(reporter) => {
                reporter.warning(message);
            }
            None => eprintln!("[LOGGER WARNING] {}", message),
        }
    }

    fn open_append(path: &Path) -> Result<(File, u64, SystemTime)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "open log file",
                    format!("Failed to open '{}'", path.display()),
                    e,
                )
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::io_operation(
                "open log file",
                format!("Cannot access metadata of '{}'", path.display()),
                e,
            )
        })?;
        let opened_at = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        Ok((file, metadata.len(), opened_at))
    }
}

impl Sink for RotatingFileSink {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let mut formatted = self.output_format.format(record, &self.timestamp_format);
        formatted.push('\n');
        let bytes = formatted.len() as u64;

        if self.should_rotate(bytes) {
            if let Err(e) = self.rotate() {
                self.recover(&e).map_err(|_| e)?;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::other("file writer not initialized"))?;
        writer.write_all(formatted.as_bytes()).map_err(|e| {
            LoggerError::io_operation(
                "write log record",
                format!("Failed to write to '{}'", self.base_path.display()),
                e,
            )
        })?;
        if self.auto_flush {
            writer.flush()?;
        }
        self.current_size += bytes;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::io_operation(
                    "flush log file",
                    format!("Failed to flush '{}'", self.base_path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `path` into `<path>.gz`, removing the original only once the
/// compressed file is complete.
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let gz = gz_path(path);
    let mut tmp = gz.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let compress = || -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&tmp)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&tmp, &gz)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&tmp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    // The backup survives as .gz; a leftover plain copy is not fatal
    let _ = fs::remove_file(path);
    Ok(())
}
