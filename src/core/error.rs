//! Error types for the logging facade

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid setup arguments, raised synchronously by setup calls
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration {
        component: String,
        message: String,
        /// Failure met while applying the setting, if any
        #[source]
        source: Option<Box<LoggerError>>,
    },

    /// Unknown severity name or number
    #[error("Invalid severity: '{value}'")]
    InvalidSeverity { value: String },

    /// A sink failed while emitting a record
    #[error("Sink '{sink}' failed to emit: {message}")]
    SinkEmission { sink: String, message: String },

    /// Message template and arguments do not match
    #[error("Formatting error: {message}")]
    Formatting { message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Mail transport error
    #[error("Mail transport error ({host}): {message}")]
    Transport { host: String, message: String },

    /// Background worker is gone
    #[error("Failed to hand record to background worker of '{sink}'")]
    ChannelSendError { sink: String },

    /// Logger already shut down
    #[error("Logger already shut down")]
    LoggerClosed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Restate a failure met while applying a setup call as a configuration
    /// error, keeping the failure as its source.
    pub fn setup_failed(component: impl Into<String>, error: LoggerError) -> Self {
        match error {
            LoggerError::InvalidConfiguration { .. } => error,
            other => LoggerError::InvalidConfiguration {
                component: component.into(),
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    pub fn invalid_severity(value: impl Into<String>) -> Self {
        LoggerError::InvalidSeverity {
            value: value.into(),
        }
    }

    pub fn sink_emission(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkEmission {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn formatting(message: impl Into<String>) -> Self {
        LoggerError::Formatting {
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Transport {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
