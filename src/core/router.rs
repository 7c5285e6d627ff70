//! Record routing to registered sinks
//!
//! The router owns the sink registry. Each sink sits behind its own mutex,
//! so sinks serialize their own I/O without holding up one another, and
//! every emission runs under per-sink panic isolation: one failing sink never
//! prevents delivery to the rest, and no sink failure reaches the caller.

use super::{
    diagnostics::FailureReporter,
    error::{LoggerError, Result},
    exception::panic_message,
    gate::SeverityGate,
    metrics::LoggerMetrics,
    record::LogRecord,
    severity::Severity,
    sink::Sink,
};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct SinkSlot {
    id: String,
    /// Per-sink minimum; `None` means only the effective level applies.
    floor: Option<Severity>,
    sink: Mutex<Box<dyn Sink>>,
    consecutive_failures: AtomicU64,
}

impl SinkSlot {
    #[inline]
    fn accepts(&self, severity: Severity) -> bool {
        self.floor.map_or(true, |floor| severity >= floor)
    }

    fn emit_isolated(&self, record: &LogRecord) -> Result<()> {
        let mut sink = self.sink.lock();
        match catch_unwind(AssertUnwindSafe(|| sink.emit(record))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LoggerError::sink_emission(&self.id, e.to_string())),
            Err(panic_info) => Err(LoggerError::sink_emission(
                &self.id,
                format!("panicked: {}", panic_message(panic_info.as_ref())),
            )),
        }
    }

    fn flush_isolated(&self) -> Result<()> {
        let mut sink = self.sink.lock();
        match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
            Ok(result) => result,
            Err(panic_info) => Err(LoggerError::sink_emission(
                &self.id,
                format!("panicked during flush: {}", panic_message(panic_info.as_ref())),
            )),
        }
    }
}

pub struct Router {
    gate: Arc<SeverityGate>,
    slots: RwLock<Vec<SinkSlot>>,
    metrics: Arc<LoggerMetrics>,
    reporter: Arc<FailureReporter>,
}

impl Router {
    pub fn new(
        gate: Arc<SeverityGate>,
        metrics: Arc<LoggerMetrics>,
        reporter: Arc<FailureReporter>,
    ) -> Self {
        Self {
            gate,
            slots: RwLock::new(Vec::new()),
            metrics,
            reporter,
        }
    }

    pub fn gate(&self) -> &Arc<SeverityGate> {
        &self.gate
    }

    pub fn reporter(&self) -> &Arc<FailureReporter> {
        &self.reporter
    }

    pub fn metrics(&self) -> &Arc<LoggerMetrics> {
        &self.metrics
    }

    /// Register `sink` under `id`, or replace the sink already registered
    /// under that id in place (keeping its position).
    ///
    /// Returns the replaced sink, if any.
    pub fn register(
        &self,
        id: impl Into<String>,
        sink: Box<dyn Sink>,
        floor: Option<Severity>,
    ) -> Option<Box<dyn Sink>> {
        let slot = SinkSlot {
            id: id.into(),
            floor,
            sink: Mutex::new(sink),
            consecutive_failures: AtomicU64::new(0),
        };

        let mut slots = self.slots.write();
        match slots.iter().position(|existing| existing.id == slot.id) {
            Some(pos) => {
                let old = std::mem::replace(&mut slots[pos], slot);
                Some(old.sink.into_inner())
            }
            None => {
                slots.push(slot);
                None
            }
        }
    }

    /// Whether a record of `severity` would pass the effective threshold.
    #[inline]
    pub fn accepts(&self, severity: Severity) -> bool {
        self.gate.is_enabled(severity)
    }

    /// Deliver `record` to every sink whose floor it satisfies, provided it
    /// passes the calling thread's effective threshold.
    ///
    /// Returns the number of sinks that accepted the record.
    pub fn dispatch(&self, record: &LogRecord) -> usize {
        if !self.accepts(record.severity()) {
            self.metrics.record_filtered();
            return 0;
        }
        self.metrics.record_dispatched();

        let slots = self.slots.read();
        let mut delivered = 0;

        for slot in slots.iter().filter(|slot| slot.accepts(record.severity())) {
            match slot.emit_isolated(record) {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.record_delivered();
                    let failures = slot.consecutive_failures.swap(0, Ordering::Relaxed);
                    if failures > 0 {
                        self.reporter.recovered(&slot.id, failures);
                    }
                }
                Err(e) => {
                    self.metrics.record_sink_failure();
                    let streak = slot.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                    self.reporter.failure(&slot.id, &e, streak);
                }
            }
        }

        delivered
    }

    /// Flush every sink, returning the first error after trying them all.
    pub fn flush(&self) -> Result<()> {
        let slots = self.slots.read();
        let mut first_error = None;
        for slot in slots.iter() {
            if let Err(e) = slot.flush_isolated() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Ids of registered sinks in dispatch order.
    pub fn sink_ids(&self) -> Vec<String> {
        self.slots.read().iter().map(|slot| slot.id.clone()).collect()
    }

    pub fn floor_of(&self, id: &str) -> Option<Option<Severity>> {
        self.slots
            .read()
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.floor)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Flush and release every sink. Later dispatches reach nothing.
    pub fn close(&self) -> Result<()> {
        let result = self.flush();
        let drained: Vec<SinkSlot> = self.slots.write().drain(..).collect();
        // Sinks close their resources in Drop, outside the registry lock
        drop(drained);
        result
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("sinks", &self.sink_ids())
            .field("base_level", &self.gate.base_level())
            .finish()
    }
}
