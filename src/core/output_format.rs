//! Output format configuration for log records
//!
//! Provides different output formats for log records:
//! - Text: Human-readable format (default)
//! - Json: Machine-readable JSON format
//! - Logfmt: Key-value format compatible with log aggregation tools

use super::record::{CallOutcome, LogRecord};
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `[2025-01-08T10:30:45.123Z] [INFO] [root] Request processed`
    ///
    /// Exception details follow on the next lines as a traceback block.
    #[default]
    Text,

    /// JSON format for machine processing, one object per line
    ///
    /// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","logger":"root","message":"Request processed"}`
    Json,

    /// Logfmt format (key=value pairs)
    ///
    /// Example: `timestamp=2025-01-08T10:30:45.123Z level=INFO logger=root message="Request processed"`
    Logfmt,
}

impl OutputFormat {
    /// Format a record according to this output format
    pub fn format(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => self.format_text(record, timestamp_format),
            OutputFormat::Json => self.format_json(record, timestamp_format),
            OutputFormat::Logfmt => self.format_logfmt(record, timestamp_format),
        }
    }

    fn format_text(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            timestamp_format.format(record.timestamp()),
            record.severity().to_str(),
            record.logger_name(),
            record.message()
        );

        if let Some(exception) = record.exception() {
            let block = exception.render();
            if !block.is_empty() {
                line.push('\n');
                line.push_str(&block);
            }
        }

        line
    }

    fn format_json(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut json_obj = serde_json::Map::new();

        json_obj.insert(
            "timestamp".to_string(),
            timestamp_format.to_json(record.timestamp()),
        );
        json_obj.insert(
            "level".to_string(),
            serde_json::Value::String(record.severity().to_str().to_string()),
        );
        json_obj.insert(
            "logger".to_string(),
            serde_json::Value::String(record.logger_name().to_string()),
        );
        json_obj.insert(
            "message".to_string(),
            serde_json::Value::String(record.message().to_string()),
        );
        json_obj.insert(
            "thread_id".to_string(),
            serde_json::Value::String(record.thread_id().to_string()),
        );
        if let Some(name) = record.thread_name() {
            json_obj.insert(
                "thread_name".to_string(),
                serde_json::Value::String(name.to_string()),
            );
        }

        if let Some(location) = record.location() {
            json_obj.insert("file".to_string(), location.file.into());
            json_obj.insert("line".to_string(), location.line.into());
        }

        if let Some(exception) = record.exception() {
            if let Ok(value) = serde_json::to_value(exception) {
                json_obj.insert("exception".to_string(), value);
            }
        }
        if let Some(call) = record.call() {
            if let Ok(value) = serde_json::to_value(call) {
                json_obj.insert("call".to_string(), value);
            }
        }

        serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
    }

    fn format_logfmt(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut parts = vec![
            format!(
                "timestamp={}",
                self.escape_logfmt_value(&timestamp_format.format(record.timestamp()))
            ),
            format!("level={}", record.severity().to_str()),
            format!("logger={}", self.escape_logfmt_value(record.logger_name())),
            // Always quoted
            format!("message={}", self.quote_logfmt_value(record.message())),
            format!("thread_id={}", self.escape_logfmt_value(record.thread_id())),
        ];

        if let Some(location) = record.location() {
            parts.push(format!("file={}", self.escape_logfmt_value(location.file)));
            parts.push(format!("line={}", location.line));
        }

        if let Some(call) = record.call() {
            parts.push(format!("function={}", self.escape_logfmt_value(&call.function)));
            let stage = match call.outcome {
                CallOutcome::Entered => "entered",
                CallOutcome::Returned(_) => "returned",
                CallOutcome::Failed => "failed",
            };
            parts.push(format!("stage={}", stage));
        }

        if let Some(exception) = record.exception() {
            if !exception.is_empty() {
                parts.push(format!(
                    "exception_type={}",
                    self.escape_logfmt_value(exception.type_name())
                ));
                parts.push(format!(
                    "exception_message={}",
                    self.quote_logfmt_value(exception.message())
                ));
            }
        }

        parts.join(" ")
    }

    /// Quote a logfmt value if it contains spaces, quotes or `=`
    fn escape_logfmt_value(&self, value: &str) -> String {
        if value.is_empty() || value.contains([' ', '"', '=']) {
            self.quote_logfmt_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_logfmt_value(&self, value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallContext, ExceptionInfo, Severity, StackFrame};

    fn record(severity: Severity, message: &str) -> LogRecord {
        LogRecord::new(severity, "root", message)
    }

    #[test]
    fn test_text_format() {
        let result = OutputFormat::Text.format(&record(Severity::Info, "Test message"), &TimestampFormat::Iso8601);

        assert!(result.starts_with('['));
        assert!(result.ends_with("] [INFO] [root] Test message"));
        assert_eq!(result.lines().count(), 1);
    }

    #[test]
    fn test_text_format_with_exception() {
        let exception = ExceptionInfo::new("ParseIntError", "invalid digit found in string")
            .with_frames(vec![StackFrame::new("src/main.rs", 3, "app::main")]);
        let entry = record(Severity::Error, "parse failed").with_exception(exception);

        let result = OutputFormat::Text.format(&entry, &TimestampFormat::Iso8601);
        let lines: Vec<&str> = result.lines().collect();

        assert!(lines[0].ends_with("[ERROR] [root] parse failed"));
        assert_eq!(lines[1], "Traceback (most recent call first):");
        assert_eq!(lines[2], "  at app::main (src/main.rs:3)");
        assert_eq!(lines[3], "ParseIntError: invalid digit found in string");
    }

    #[test]
    fn test_text_format_empty_exception_adds_nothing() {
        let entry = record(Severity::Error, "nothing caught").with_exception(ExceptionInfo::empty());
        let result = OutputFormat::Text.format(&entry, &TimestampFormat::Iso8601);
        assert_eq!(result.lines().count(), 1);
    }

    #[test]
    fn test_json_format() {
        let result = OutputFormat::Json.format(&record(Severity::Error, "Error occurred"), &TimestampFormat::Iso8601);

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["logger"], "root");
        assert_eq!(parsed["message"], "Error occurred");
        assert!(parsed["timestamp"].is_string());
        assert!(parsed.get("exception").is_none());
    }

    #[test]
    fn test_json_format_with_call_and_exception() {
        let entry = record(Severity::Error, "Function load failed")
            .with_call(CallContext::new("load", Some("(\"x\",)".into()), CallOutcome::Failed))
            .with_exception(ExceptionInfo::new("Error", "not found"));

        let result = OutputFormat::Json.format(&entry, &TimestampFormat::UnixMillis);
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();

        assert!(parsed["timestamp"].is_number());
        assert_eq!(parsed["call"]["function"], "load");
        assert_eq!(parsed["call"]["outcome"]["stage"], "failed");
        assert_eq!(parsed["exception"]["type_name"], "Error");
        assert_eq!(parsed["exception"]["message"], "not found");
    }

    #[test]
    fn test_logfmt_format() {
        let result = OutputFormat::Logfmt.format(&record(Severity::Warning, "Warning message"), &TimestampFormat::Iso8601);

        assert!(result.contains("level=WARNING"));
        assert!(result.contains("logger=root"));
        assert!(result.contains("message=\"Warning message\""));
    }

    #[test]
    fn test_logfmt_escapes_quotes() {
        let result = OutputFormat::Logfmt.format(
            &record(Severity::Debug, "said \"hi\" a=b"),
            &TimestampFormat::Iso8601,
        );
        assert!(result.contains(r#"message="said \"hi\" a=b""#));
    }

    #[test]
    fn test_output_format_default_and_serde() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        let format: OutputFormat = serde_json::from_str("\"logfmt\"").unwrap();
        assert_eq!(format, OutputFormat::Logfmt);
    }
}
