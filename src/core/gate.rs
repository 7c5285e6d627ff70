//! Effective severity threshold with scoped, per-thread overrides
//!
//! The base level is shared by every thread. Overrides live on a
//! thread-local stack keyed by gate, so a temporary level pushed on one
//! thread is never visible to another. Each override is released by the
//! `Drop` of its [`LevelOverride`] guard, which also runs during panic
//! unwinding.

use super::error::Result;
use super::severity::{IntoSeverity, Severity};
use parking_lot::RwLock;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct OverrideEntry {
    gate: u64,
    token: u64,
    level: Severity,
}

thread_local! {
    static OVERRIDES: RefCell<Vec<OverrideEntry>> = const { RefCell::new(Vec::new()) };
}

/// Holds the configured base level and resolves the effective level.
#[derive(Debug)]
pub struct SeverityGate {
    id: u64,
    base_level: RwLock<Severity>,
}

impl SeverityGate {
    pub fn new(base_level: Severity) -> Self {
        Self {
            id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
            base_level: RwLock::new(base_level),
        }
    }

    pub fn base_level(&self) -> Severity {
        *self.base_level.read()
    }

    pub fn set_base_level(&self, level: Severity) {
        *self.base_level.write() = level;
    }

    /// Effective threshold for the calling thread: the innermost live
    /// override, or the base level when there is none.
    pub fn current_level(&self) -> Severity {
        OVERRIDES
            .with(|stack| {
                stack
                    .borrow()
                    .iter()
                    .rev()
                    .find(|entry| entry.gate == self.id)
                    .map(|entry| entry.level)
            })
            .unwrap_or_else(|| self.base_level())
    }

    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        severity >= self.current_level()
    }

    /// Number of live overrides of this gate on the calling thread.
    pub fn override_depth(&self) -> usize {
        OVERRIDES.with(|stack| {
            stack
                .borrow()
                .iter()
                .filter(|entry| entry.gate == self.id)
                .count()
        })
    }

    /// Push a temporary level for the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidSeverity`](super::LoggerError::InvalidSeverity)
    /// if `level` does not name a severity; nothing is pushed in that case.
    pub fn push_override(&self, level: impl IntoSeverity) -> Result<LevelOverride> {
        let level = level.into_severity()?;
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        OVERRIDES.with(|stack| {
            stack.borrow_mut().push(OverrideEntry {
                gate: self.id,
                token,
                level,
            })
        });
        Ok(LevelOverride {
            token,
            level,
            _not_send: PhantomData,
        })
    }
}

impl Default for SeverityGate {
    fn default() -> Self {
        Self::new(Severity::default())
    }
}

/// RAII guard for a temporary severity level.
///
/// Dropping the guard removes exactly the entry it pushed, so guards may be
/// released in any order. The guard is tied to the thread that created it.
#[must_use = "the override is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LevelOverride {
    token: u64,
    level: Severity,
    _not_send: PhantomData<*const ()>,
}

impl LevelOverride {
    pub fn level(&self) -> Severity {
        self.level
    }
}

impl Drop for LevelOverride {
    fn drop(&mut self) {
        let token = self.token;
        // try_with: the thread-local may already be gone during thread teardown
        let _ = OVERRIDES.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|entry| entry.token == token) {
                stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggerError;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_base_level() {
        let gate = SeverityGate::new(Severity::Warning);
        assert_eq!(gate.current_level(), Severity::Warning);
        assert!(!gate.is_enabled(Severity::Info));
        assert!(gate.is_enabled(Severity::Error));

        gate.set_base_level(Severity::Debug);
        assert!(gate.is_enabled(Severity::Debug));
    }

    #[test]
    fn test_nested_lifo_restores() {
        let gate = SeverityGate::new(Severity::Info);
        {
            let _a = gate.push_override(Severity::Debug).unwrap();
            assert_eq!(gate.current_level(), Severity::Debug);
            {
                let _b = gate.push_override("ERROR").unwrap();
                assert_eq!(gate.current_level(), Severity::Error);
                {
                    let _c = gate.push_override(Severity::Critical).unwrap();
                    assert_eq!(gate.current_level(), Severity::Critical);
                    assert_eq!(gate.override_depth(), 3);
                }
                assert_eq!(gate.current_level(), Severity::Error);
            }
            assert_eq!(gate.current_level(), Severity::Debug);
        }
        assert_eq!(gate.current_level(), Severity::Info);
        assert_eq!(gate.override_depth(), 0);
    }

    #[test]
    fn test_out_of_order_release() {
        let gate = SeverityGate::new(Severity::Info);
        let a = gate.push_override(Severity::Debug).unwrap();
        let b = gate.push_override(Severity::Warning).unwrap();
        let c = gate.push_override(Severity::Error).unwrap();

        drop(b);
        assert_eq!(gate.current_level(), Severity::Error);
        drop(c);
        assert_eq!(gate.current_level(), Severity::Debug);
        drop(a);
        assert_eq!(gate.current_level(), Severity::Info);
        assert_eq!(gate.override_depth(), 0);
    }

    #[test]
    fn test_release_on_panic() {
        let gate = SeverityGate::new(Severity::Info);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = gate.push_override(Severity::Debug).unwrap();
            assert_eq!(gate.current_level(), Severity::Debug);
            panic!("inside scope");
        }));
        assert!(result.is_err());
        assert_eq!(gate.current_level(), Severity::Info);
        assert_eq!(gate.override_depth(), 0);
    }

    #[test]
    fn test_invalid_level_pushes_nothing() {
        let gate = SeverityGate::new(Severity::Info);
        let err = gate.push_override("LOUD").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidSeverity { .. }));
        assert_eq!(gate.override_depth(), 0);
    }

    #[test]
    fn test_gates_are_independent() {
        let first = SeverityGate::new(Severity::Info);
        let second = SeverityGate::new(Severity::Info);
        let _guard = first.push_override(Severity::Debug).unwrap();
        assert_eq!(first.current_level(), Severity::Debug);
        assert_eq!(second.current_level(), Severity::Info);
    }

    #[test]
    fn test_threads_do_not_share_overrides() {
        let gate = Arc::new(SeverityGate::new(Severity::Info));
        let barrier = Arc::new(Barrier::new(2));

        let spawn = |level: Severity| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _guard = gate.push_override(level).unwrap();
                barrier.wait();
                let seen = gate.current_level();
                barrier.wait();
                seen
            })
        };

        let debug = spawn(Severity::Debug);
        let critical = spawn(Severity::Critical);

        assert_eq!(debug.join().unwrap(), Severity::Debug);
        assert_eq!(critical.join().unwrap(), Severity::Critical);
        assert_eq!(gate.current_level(), Severity::Info);
    }
}
