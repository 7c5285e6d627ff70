//! Overflow policies for background sink queues
//!
//! When a background sink's queue is full, the policy decides whether the
//! logging thread waits for space or the record is dropped.

use super::severity::Severity;
use std::fmt;
use std::time::Duration;

/// Policy for handling queue overflow in a [`BackgroundSink`](crate::sinks::BackgroundSink)
///
/// Records at [`Severity::Error`] and above are never dropped: under any
/// policy they wait for queue space.
///
/// # Example
///
/// ```
/// use master_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop new records when the queue is full, counting them only
    DropNewest,

    /// Block until space is available
    ///
    /// Can cause backpressure in the application.
    Block,

    /// Block with timeout, then drop with an alert
    BlockWithTimeout(Duration),

    /// Drop and write a `[LOGGER WARNING]` line on the first drop and every
    /// thousandth drop after it
    #[default]
    AlertAndDrop,
}

impl OverflowPolicy {
    /// Whether a record of `severity` must wait for space rather than be dropped.
    #[inline]
    pub fn preserves(&self, severity: Severity) -> bool {
        matches!(self, OverflowPolicy::Block) || severity >= Severity::Error
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}
