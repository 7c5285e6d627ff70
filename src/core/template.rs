//! Message templates and record construction
//!
//! Templates use `{}` for the next argument, `{N}` for a positional
//! argument and `{{` / `}}` for literal braces. Rendering errors never reach
//! the caller: [`RecordFactory`] embeds the raw template with a marker.

use super::error::{LoggerError, Result};
use super::exception::ExceptionInfo;
use super::instrument::UNREPRESENTABLE;
use super::record::{CallContext, LogRecord, SourceLocation};
use super::severity::Severity;
use std::fmt::{self, Write as _};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Render `template` with `args`.
///
/// # Errors
///
/// Returns [`LoggerError::Formatting`] on an unclosed or stray brace, a
/// placeholder without a matching argument, a non-numeric placeholder, or
/// arguments left unused.
pub fn render(template: &str, args: &[&dyn fmt::Display]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut used = vec![false; args.len()];
    let mut next = 0usize;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut spec = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    spec.push(c);
                }
                if !closed {
                    return Err(LoggerError::formatting(format!(
                        "unclosed '{{' at byte {}",
                        pos
                    )));
                }

                let index = if spec.trim().is_empty() {
                    let index = next;
                    next += 1;
                    index
                } else {
                    spec.trim().parse::<usize>().map_err(|_| {
                        LoggerError::formatting(format!("invalid placeholder '{{{}}}'", spec))
                    })?
                };

                let arg = args.get(index).ok_or_else(|| {
                    LoggerError::formatting(format!(
                        "placeholder {} has no argument ({} supplied)",
                        index,
                        args.len()
                    ))
                })?;
                used[index] = true;
                let text = display(*arg).ok_or_else(|| {
                    LoggerError::formatting(format!("argument {} failed to display", index))
                })?;
                out.push_str(&text);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(LoggerError::formatting(format!(
                        "unmatched '}}' at byte {}",
                        pos
                    )));
                }
            }
            c => out.push(c),
        }
    }

    let unused = used.iter().filter(|u| !**u).count();
    if unused > 0 {
        return Err(LoggerError::formatting(format!(
            "{} of {} arguments not used",
            unused,
            args.len()
        )));
    }

    Ok(out)
}

/// `Display` output of `value`, or `None` when formatting fails or panics.
///
/// A panic is caught, but the panic hook still reports it on stderr.
pub(crate) fn display(value: &dyn fmt::Display) -> Option<String> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut out = String::new();
        write!(out, "{}", value).map(|_| out).ok()
    }))
    .ok()
    .flatten()
}

/// Builds [`LogRecord`]s from the arguments of a logging call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFactory;

impl RecordFactory {
    /// Build a record whose message is `template` rendered with `args`.
    ///
    /// A template/argument mismatch does not fail: the message becomes the
    /// raw template followed by `[formatting error: ...]` and the arguments.
    pub fn build(
        logger_name: &str,
        severity: Severity,
        template: &str,
        args: &[&dyn fmt::Display],
    ) -> LogRecord {
        let message = if args.is_empty() && !template.contains(['{', '}']) {
            template.to_string()
        } else {
            match render(template, args) {
                Ok(message) => message,
                Err(e) => Self::degraded(template, args, &e),
            }
        };
        LogRecord::new(severity, logger_name, &message)
    }

    /// Build a record from an already rendered message.
    pub fn build_message(logger_name: &str, severity: Severity, message: &str) -> LogRecord {
        LogRecord::new(severity, logger_name, message)
    }

    pub(crate) fn build_full(
        logger_name: &str,
        severity: Severity,
        message: &str,
        exception: Option<ExceptionInfo>,
        call: Option<CallContext>,
        location: Option<SourceLocation>,
    ) -> LogRecord {
        let mut record = LogRecord::new(severity, logger_name, message);
        if let Some(exception) = exception {
            record = record.with_exception(exception);
        }
        if let Some(call) = call {
            record = record.with_call(call);
        }
        if let Some(location) = location {
            record = record.with_location(location);
        }
        record
    }

    fn degraded(template: &str, args: &[&dyn fmt::Display], error: &LoggerError) -> String {
        let reason = match error {
            LoggerError::Formatting { message } => message.as_str(),
            _ => "unknown",
        };
        let mut message = format!("{} [formatting error: {}]", template, reason);
        if !args.is_empty() {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| display(*a).unwrap_or_else(|| UNREPRESENTABLE.to_string()))
                .collect();
            let _ = write!(message, " args=[{}]", rendered.join(", "));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDisplay;

    impl fmt::Display for FailingDisplay {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    struct PanickingDisplay;

    impl fmt::Display for PanickingDisplay {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    #[test]
    fn test_failing_display_degrades() {
        assert!(matches!(
            render("value {}", &[&FailingDisplay]),
            Err(LoggerError::Formatting { .. })
        ));

        let record = RecordFactory::build("root", Severity::Info, "value {} and {}", &[&FailingDisplay, &7]);
        assert!(record.message().starts_with("value {} and {} [formatting error: argument 0 failed to display]"));
        assert!(record.message().ends_with("args=[<unrepresentable>, 7]"));
    }

    #[test]
    fn test_panicking_display_degrades() {
        let record = RecordFactory::build("root", Severity::Error, "value {}", &[&PanickingDisplay]);
        assert!(record.message().contains("[formatting error: argument 0 failed to display]"));
        assert!(record.message().ends_with("args=[<unrepresentable>]"));
    }

    #[test]
    fn test_sequential_and_positional() {
        assert_eq!(render("{} + {} = {}", &[&3, &4, &7]).unwrap(), "3 + 4 = 7");
        assert_eq!(render("{1} before {0}", &[&"a", &"b"]).unwrap(), "b before a");
        assert_eq!(render("{0} and {0}", &[&"x"]).unwrap(), "x and x");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render("{{literal}} {}", &[&1]).unwrap(), "{literal} 1");
    }

    #[test]
    fn test_errors() {
        assert!(render("{}", &[]).is_err());
        assert!(render("{", &[&1]).is_err());
        assert!(render("}", &[]).is_err());
        assert!(render("{name}", &[&1]).is_err());
        assert!(render("no placeholders", &[&1]).is_err());
    }

    #[test]
    fn test_factory_degrades() {
        let record = RecordFactory::build("root", Severity::Info, "user {} logged {}", &[&"bob"]);
        assert!(record.message().starts_with("user {} logged {} [formatting error:"));
        assert!(record.message().ends_with("args=[bob]"));
    }

    #[test]
    fn test_factory_plain_message_untouched() {
        let record = RecordFactory::build("svc", Severity::Warning, "disk at 91%", &[]);
        assert_eq!(record.message(), "disk at 91%");
        assert_eq!(record.logger_name(), "svc");
        assert_eq!(record.severity(), Severity::Warning);
    }

    #[test]
    fn test_factory_braces_without_args_degrade() {
        let record = RecordFactory::build("root", Severity::Info, "map {key}", &[]);
        assert!(record.message().contains("[formatting error:"));
    }
}
