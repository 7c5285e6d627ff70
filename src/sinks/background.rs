//! Off-thread delivery for slow sinks
//!
//! A [`BackgroundSink`] owns a worker thread and a bounded queue. `emit`
//! only enqueues; the worker hands records to the wrapped sink with the same
//! panic isolation and failure reporting the router applies to direct sinks.

use crate::core::diagnostics::FailureReporter;
use crate::core::error::{LoggerError, Result};
use crate::core::exception::panic_message;
use crate::core::{LogRecord, OverflowPolicy, Sink};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default queue capacity of a background sink.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long dropping a background sink waits for its queue to drain.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

enum Command {
    Record(Box<LogRecord>),
    Flush(Sender<Result<()>>),
}

/// Wraps a sink so that emission happens on a dedicated worker thread
///
/// # Example
///
/// ```
/// use master_logger::sinks::{BackgroundSink, ConsoleSink};
/// use master_logger::OverflowPolicy;
///
/// let sink = BackgroundSink::spawn(Box::new(ConsoleSink::new()), 256, OverflowPolicy::Block).unwrap();
/// ```
pub struct BackgroundSink {
    name: String,
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    policy: OverflowPolicy,
    reporter: Arc<FailureReporter>,
    shutdown_timeout: Duration,
}

impl BackgroundSink {
    /// Start a worker for `inner`, reporting its failures to standard error.
    ///
    /// # Errors
    ///
    /// Returns error if `capacity` is zero or the worker thread cannot be
    /// spawned
    pub fn spawn(inner: Box<dyn Sink>, capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        let reporter = Arc::new(FailureReporter::stderr(Default::default()));
        Self::spawn_with_reporter(inner, capacity, policy, reporter)
    }

    /// # Errors
    ///
    /// Returns error if `capacity` is zero or the worker thread cannot be
    /// spawned
    pub fn spawn_with_reporter(
        inner: Box<dyn Sink>,
        capacity: usize,
        policy: OverflowPolicy,
        reporter: Arc<FailureReporter>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config("background", "queue capacity must be greater than zero"));
        }

        let name = inner.name().to_string();
        let (sender, receiver) = bounded(capacity);
        let worker_reporter = Arc::clone(&reporter);
        let worker = thread::Builder::new()
            .name(format!("master-logger-{}", name))
            .spawn(move || run_worker(inner, receiver, worker_reporter))
            .map_err(|e| LoggerError::io_operation("spawn sink worker", name.clone(), e))?;

        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
            policy,
            reporter,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Records waiting in the queue
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    fn handle_overflow(&self, sender: &Sender<Command>, command: Command, preserve: bool) -> Result<()> {
        if preserve {
            return sender
                .send(command)
                .map_err(|_| LoggerError::ChannelSendError { sink: self.name.clone() });
        }

        match self.policy {
            OverflowPolicy::BlockWithTimeout(timeout) => match sender.send_timeout(command, timeout) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => {
                    self.alert_and_drop();
                    Ok(())
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    Err(LoggerError::ChannelSendError { sink: self.name.clone() })
                }
            },
            OverflowPolicy::DropNewest => {
                self.reporter.metrics().record_queue_dropped();
                Ok(())
            }
            OverflowPolicy::AlertAndDrop => {
                self.alert_and_drop();
                Ok(())
            }
            // Block always preserves
            OverflowPolicy::Block => Ok(()),
        }
    }

    fn alert_and_drop(&self) {
        let dropped = self.reporter.metrics().record_queue_dropped() + 1;
        if dropped == 1 || dropped % 1000 == 0 {
            self.reporter.warning(format_args!(
                "Queue of sink '{}' full, {} records dropped. \
                 Consider increasing its capacity or using a blocking overflow policy.",
                self.name, dropped
            ));
        }
    }

    /// Close the queue and wait up to the shutdown timeout for the worker to
    /// drain it. Returns whether the worker finished in time.
    fn stop(&mut self) -> bool {
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return true;
        };
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    self.reporter
                        .warning(format_args!("Worker of sink '{}' panicked during shutdown", self.name));
                    return false;
                }
                return true;
            }
            if start.elapsed() >= self.shutdown_timeout {
                self.reporter.warning(format_args!(
                    "Worker of sink '{}' did not finish within {:?}. Some records may be lost.",
                    self.name, self.shutdown_timeout
                ));
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn run_worker(mut inner: Box<dyn Sink>, receiver: Receiver<Command>, reporter: Arc<FailureReporter>) {
    let name = inner.name().to_string();
    let mut consecutive_failures = 0u64;

    for command in receiver.iter() {
        match command {
            Command::Record(record) => {
                let result = catch_unwind(AssertUnwindSafe(|| inner.emit(&record)));
                let error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(LoggerError::sink_emission(&name, e.to_string())),
                    Err(panic_info) => Some(LoggerError::sink_emission(
                        &name,
                        format!("panicked: {}", panic_message(panic_info.as_ref())),
                    )),
                };
                match error {
                    None => {
                        if consecutive_failures > 0 {
                            reporter.recovered(&name, consecutive_failures);
                            consecutive_failures = 0;
                        }
                    }
                    Some(e) => {
                        reporter.metrics().record_sink_failure();
                        consecutive_failures += 1;
                        reporter.failure(&name, &e, consecutive_failures);
                    }
                }
            }
            Command::Flush(ack) => {
                let result = match catch_unwind(AssertUnwindSafe(|| inner.flush())) {
                    Ok(result) => result,
                    Err(panic_info) => Err(LoggerError::sink_emission(
                        &name,
                        format!("panicked during flush: {}", panic_message(panic_info.as_ref())),
                    )),
                };
                // The flusher may have given up waiting
                let _ = ack.send(result);
            }
        }
    }

    let _ = catch_unwind(AssertUnwindSafe(|| inner.flush()));
}

impl Sink for BackgroundSink {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(LoggerError::LoggerClosed)?;
        let command = Command::Record(Box::new(record.clone()));
        let preserve = self.policy.preserves(record.severity());

        match sender.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => self.handle_overflow(sender, command, preserve),
            Err(TrySendError::Disconnected(_)) => {
                Err(LoggerError::ChannelSendError { sink: self.name.clone() })
            }
        }
    }

    /// Wait until everything queued before this call has been emitted and
    /// the wrapped sink flushed.
    fn flush(&mut self) -> Result<()> {
        let sender = match self.sender.as_ref() {
            Some(sender) => sender,
            None => return Ok(()),
        };
        let (ack, done) = bounded(1);
        sender
            .send(Command::Flush(ack))
            .map_err(|_| LoggerError::ChannelSendError { sink: self.name.clone() })?;
        done.recv_timeout(FLUSH_TIMEOUT).map_err(|_| {
            LoggerError::sink_emission(&self.name, "worker did not confirm flush in time")
        })?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BackgroundSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundSink")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("queued", &self.queued())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoggerMetrics, RecordFactory, Severity};
    use parking_lot::Mutex;
    use std::io::Write;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<String>>>);

    struct SlowSink {
        seen: Recorded,
        delay: Duration,
        fail: bool,
    }

    impl Sink for SlowSink {
        fn emit(&mut self, record: &LogRecord) -> Result<()> {
            thread::sleep(self.delay);
            if self.fail {
                return Err(LoggerError::other("smtp down"));
            }
            self.seen.0.lock().push(record.message().to_string());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn reporter() -> (Arc<FailureReporter>, SharedBuf) {
        let buf = SharedBuf::default();
        let reporter = FailureReporter::with_writer(Box::new(buf.clone()), Arc::new(LoggerMetrics::new()));
        (Arc::new(reporter), buf)
    }

    fn record(severity: Severity, message: &str) -> LogRecord {
        RecordFactory::build_message("root", severity, message)
    }

    #[test]
    fn test_flush_waits_for_worker() {
        let seen = Recorded::default();
        let inner = SlowSink { seen: seen.clone(), delay: Duration::from_millis(5), fail: false };
        let mut sink = BackgroundSink::spawn(Box::new(inner), 64, OverflowPolicy::Block).unwrap();

        for i in 0..10 {
            sink.emit(&record(Severity::Info, &format!("m{}", i))).unwrap();
        }
        sink.flush().unwrap();

        let seen = seen.0.lock();
        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0], "m0");
        assert_eq!(seen[9], "m9");
    }

    #[test]
    fn test_drop_drains_queue() {
        let seen = Recorded::default();
        let inner = SlowSink { seen: seen.clone(), delay: Duration::from_millis(1), fail: false };
        let mut sink = BackgroundSink::spawn(Box::new(inner), 64, OverflowPolicy::Block).unwrap();
        for i in 0..20 {
            sink.emit(&record(Severity::Info, &format!("m{}", i))).unwrap();
        }
        drop(sink);
        assert_eq!(seen.0.lock().len(), 20);
    }

    #[test]
    fn test_drop_newest_counts_drops_but_keeps_errors() {
        let (reporter, _) = reporter();
        let seen = Recorded::default();
        let inner = SlowSink { seen: seen.clone(), delay: Duration::from_millis(20), fail: false };
        let mut sink = BackgroundSink::spawn_with_reporter(
            Box::new(inner),
            1,
            OverflowPolicy::DropNewest,
            Arc::clone(&reporter),
        )
        .unwrap();

        for i in 0..10 {
            sink.emit(&record(Severity::Debug, &format!("d{}", i))).unwrap();
        }
        sink.emit(&record(Severity::Critical, "must arrive")).unwrap();
        sink.flush().unwrap();

        assert!(reporter.metrics().queue_dropped() > 0);
        assert!(seen.0.lock().iter().any(|m| m == "must arrive"));
    }

    #[test]
    fn test_worker_failures_reported() {
        let (reporter, buf) = reporter();
        let inner = SlowSink { seen: Recorded::default(), delay: Duration::ZERO, fail: true };
        let mut sink = BackgroundSink::spawn_with_reporter(
            Box::new(inner),
            8,
            OverflowPolicy::Block,
            Arc::clone(&reporter),
        )
        .unwrap();

        sink.emit(&record(Severity::Critical, "a")).unwrap();
        sink.emit(&record(Severity::Critical, "b")).unwrap();
        sink.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("[LOGGER ERROR] Sink 'slow' failed to emit: smtp down"));
        assert_eq!(reporter.metrics().sink_failures(), 2);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let inner = SlowSink { seen: Recorded::default(), delay: Duration::ZERO, fail: false };
        assert!(BackgroundSink::spawn(Box::new(inner), 0, OverflowPolicy::Block).is_err());
    }
}
