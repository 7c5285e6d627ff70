//! Property-based tests for master_logger using proptest

use master_logger::{LogRecord, MasterLogger, RecordFactory, Severity, SeverityGate, Sink};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::fmt;
use std::sync::Arc;

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Debug),
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Critical),
    ]
}

struct FailingDisplay;

impl fmt::Display for FailingDisplay {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Err(fmt::Error)
    }
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<Severity>>>);

impl Sink for Capture {
    fn emit(&mut self, record: &LogRecord) -> master_logger::Result<()> {
        self.0.lock().push(record.severity());
        Ok(())
    }

    fn flush(&mut self) -> master_logger::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

// ============================================================================
// Severity Tests
// ============================================================================

proptest! {
    /// Severity names and numbers roundtrip
    #[test]
    fn test_severity_roundtrip(level in severity()) {
        let parsed: Severity = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
        prop_assert_eq!(Severity::from_number(level.as_number()).unwrap(), level);
        prop_assert_eq!(level.to_string(), level.to_str());
    }

    /// Ordering follows the numeric values
    #[test]
    fn test_severity_ordering(a in severity(), b in severity()) {
        prop_assert_eq!(a <= b, a.as_number() <= b.as_number());
        prop_assert_eq!(a.cmp(&b), a.as_number().cmp(&b.as_number()));
    }

    /// Names parse regardless of case
    #[test]
    fn test_severity_parse_case_insensitive(level in severity()) {
        let lower = level.to_str().to_lowercase();
        prop_assert_eq!(lower.parse::<Severity>().unwrap(), level);
    }
}

// ============================================================================
// Gate and Routing Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A record reaches a sink iff it passes both the threshold and the sink floor
    #[test]
    fn test_delivery_rule(
        threshold in severity(),
        floor in proptest::option::of(severity()),
        record in severity(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let logger = MasterLogger::with_level(dir.path().join("app.log"), threshold).unwrap();
        let capture = Capture::default();
        logger.add_sink("capture", Box::new(capture.clone()), floor);

        logger.log(record, "routed");

        let expected = record >= threshold && floor.map_or(true, |f| record >= f);
        prop_assert_eq!(capture.0.lock().len(), usize::from(expected));
    }

    /// Any nesting of overrides restores the base level once all guards drop
    #[test]
    fn test_nested_overrides_restore(
        base in severity(),
        levels in proptest::collection::vec(severity(), 0..8),
    ) {
        let gate = SeverityGate::new(base);
        {
            let mut guards = Vec::new();
            for level in &levels {
                guards.push(gate.push_override(*level).unwrap());
                prop_assert_eq!(gate.current_level(), *level);
            }
            prop_assert_eq!(gate.override_depth(), levels.len());

            while let Some(guard) = guards.pop() {
                drop(guard);
                let expected = guards.last().map_or(base, |g| g.level());
                prop_assert_eq!(gate.current_level(), expected);
            }
        }
        prop_assert_eq!(gate.current_level(), base);
        prop_assert_eq!(gate.override_depth(), 0);
    }
}

// ============================================================================
// Record Tests
// ============================================================================

proptest! {
    /// Messages never contain raw line breaks after sanitization
    #[test]
    fn test_message_is_single_line(message in ".*") {
        let record = RecordFactory::build_message("root", Severity::Info, &message);
        prop_assert!(!record.message().contains('\n'));
        prop_assert!(!record.message().contains('\r'));
    }

    /// Templates without placeholders are used verbatim
    #[test]
    fn test_plain_template_verbatim(message in "[a-zA-Z0-9 .,:;!?-]{0,64}") {
        let record = RecordFactory::build("root", Severity::Info, &message, &[]);
        prop_assert_eq!(record.message(), message.as_str());
    }

    /// Positional placeholders render their arguments
    #[test]
    fn test_template_renders_args(a in any::<i64>(), b in "[a-z]{1,16}") {
        let rendered = master_logger::core::render("{1}={0}", &[&a, &b]).unwrap();
        prop_assert_eq!(rendered, format!("{}={}", b, a));
    }

    /// Rendering never panics, whatever the template
    #[test]
    fn test_template_never_panics(template in ".{0,64}", failing in any::<bool>()) {
        let record = if failing {
            RecordFactory::build("root", Severity::Info, &template, &[&1, &FailingDisplay])
        } else {
            RecordFactory::build("root", Severity::Info, &template, &[&1, &"two"])
        };
        prop_assert!(!record.message().is_empty() || template.is_empty());
    }
}
