//! Sink trait for log output destinations

use super::{error::Result, record::LogRecord};

/// A destination that renders and persists or transmits records.
///
/// The router keeps every sink behind its own lock, so `emit` takes
/// `&mut self` and implementations need no internal synchronization.
pub trait Sink: Send {
    fn emit(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
