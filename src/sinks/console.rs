//! Colored terminal sink

use crate::core::{LogRecord, OutputFormat, Result, Severity, Sink, TimestampFormat};
use serde::Deserialize;
use std::io::{IsTerminal, Write};

/// Where console output goes
pub enum ConsoleTarget {
    Stdout,
    Stderr,
    /// ERROR and CRITICAL to stderr, everything else to stdout
    Split,
    /// Any writer, mostly for capturing output
    Writer(Box<dyn Write + Send>),
}

impl std::fmt::Debug for ConsoleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleTarget::Stdout => write!(f, "Stdout"),
            ConsoleTarget::Stderr => write!(f, "Stderr"),
            ConsoleTarget::Split => write!(f, "Split"),
            ConsoleTarget::Writer(_) => write!(f, "Writer(..)"),
        }
    }
}

/// Whether severity colors are applied to text lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when the target is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Console sink with per-severity colors
///
/// Colors: DEBUG cyan, INFO green, WARNING yellow, ERROR red, CRITICAL red on
/// white. Only the text format is colored.
///
/// # Example
///
/// ```
/// use master_logger::sinks::{ColorMode, ConsoleSink, ConsoleTarget};
/// use master_logger::OutputFormat;
///
/// let sink = ConsoleSink::new()
///     .with_target(ConsoleTarget::Stderr)
///     .with_color_mode(ColorMode::Never)
///     .with_output_format(OutputFormat::Logfmt);
/// ```
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    color_mode: ColorMode,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
            color_mode: ColorMode::Auto,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
        }
    }

    /// Sink writing into `writer`, without colors.
    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self::new()
            .with_target(ConsoleTarget::Writer(writer))
            .with_color_mode(ColorMode::Never)
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
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

    fn use_colors(&self, severity: Severity) -> bool {
        match self.color_mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => match self.target {
                ConsoleTarget::Stdout => std::io::stdout().is_terminal(),
                ConsoleTarget::Stderr => std::io::stderr().is_terminal(),
                ConsoleTarget::Split if severity >= Severity::Error => {
                    std::io::stderr().is_terminal()
                }
                ConsoleTarget::Split => std::io::stdout().is_terminal(),
                ConsoleTarget::Writer(_) => false,
            },
        }
    }

    fn render(&self, record: &LogRecord) -> String {
        let line = self.output_format.format(record, &self.timestamp_format);
        if self.output_format == OutputFormat::Text && self.use_colors(record.severity()) {
            colorize(record.severity(), &line)
        } else {
            line
        }
    }
}

#[cfg(feature = "console")]
fn colorize(severity: Severity, line: &str) -> String {
    severity.color_style(line).to_string()
}

#[cfg(not(feature = "console"))]
fn colorize(_severity: Severity, line: &str) -> String {
    line.to_string()
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let output = self.render(record);

        match &mut self.target {
            ConsoleTarget::Stdout => writeln!(std::io::stdout().lock(), "{}", output)?,
            ConsoleTarget::Stderr => writeln!(std::io::stderr().lock(), "{}", output)?,
            ConsoleTarget::Split if record.severity() >= Severity::Error => {
                writeln!(std::io::stderr().lock(), "{}", output)?
            }
            ConsoleTarget::Split => writeln!(std::io::stdout().lock(), "{}", output)?,
            ConsoleTarget::Writer(writer) => writeln!(writer, "{}", output)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.target {
            ConsoleTarget::Writer(writer) => writer.flush()?,
            _ => {
                std::io::stdout().flush()?;
                std::io::stderr().flush()?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
