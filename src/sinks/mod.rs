//! Sink implementations

pub mod background;
pub mod console;
pub mod email;
pub mod rotating_file;

pub use background::{BackgroundSink, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use console::{ColorMode, ConsoleSink, ConsoleTarget};
pub use email::{
    EmailMessage, EmailSink, MailTransport, SmtpSecurity, SmtpTransport, DEFAULT_SUBJECT_PREFIX,
};
pub use rotating_file::{
    RotatingFileSink, RotationPolicy, RotationTrigger, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES,
};

pub use crate::core::Sink;
