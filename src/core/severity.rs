//! Severity level definitions

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered log importance: `Debug < Info < Warning < Error < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug = 10,
    #[default]
    Info = 20,
    #[serde(alias = "WARN")]
    Warning = 30,
    Error = 40,
    #[serde(alias = "FATAL")]
    Critical = 50,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Numeric value compatible with the conventional 10/20/30/40/50 scale.
    pub fn as_number(&self) -> u32 {
        *self as u32
    }

    /// Look up a severity by its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`] for any value other than
    /// 10, 20, 30, 40 or 50.
    pub fn from_number(value: u32) -> Result<Self> {
        match value {
            10 => Ok(Severity::Debug),
            20 => Ok(Severity::Info),
            30 => Ok(Severity::Warning),
            40 => Ok(Severity::Error),
            50 => Ok(Severity::Critical),
            _ => Err(LoggerError::invalid_severity(value.to_string())),
        }
    }

    #[cfg(feature = "console")]
    pub fn color_style(&self, text: &str) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Severity::Debug => text.cyan(),
            Severity::Info => text.green(),
            Severity::Warning => text.yellow(),
            Severity::Error => text.red(),
            Severity::Critical => text.red().on_white(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for Severity {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" | "FATAL" => Ok(Severity::Critical),
            _ => Err(LoggerError::invalid_severity(s)),
        }
    }
}

/// Anything an API accepts where a severity is expected.
///
/// Names are parsed case-insensitively and numbers use the 10..=50 scale;
/// both fail with [`LoggerError::InvalidSeverity`] when unknown.
pub trait IntoSeverity {
    fn into_severity(self) -> Result<Severity>;
}

impl IntoSeverity for Severity {
    fn into_severity(self) -> Result<Severity> {
        Ok(self)
    }
}

impl IntoSeverity for &str {
    fn into_severity(self) -> Result<Severity> {
        self.parse()
    }
}

impl IntoSeverity for &String {
    fn into_severity(self) -> Result<Severity> {
        self.parse()
    }
}

impl IntoSeverity for String {
    fn into_severity(self) -> Result<Severity> {
        self.parse()
    }
}

impl IntoSeverity for u32 {
    fn into_severity(self) -> Result<Severity> {
        Severity::from_number(self)
    }
}
