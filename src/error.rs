use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pose source error: {0}")]
    Source(#[from] SourceError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures of a pose stream source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open pose input {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read pose input: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed pose frame on line {line}: {details}")]
    Malformed { line: u64, details: String },
}

/// Failures of the broadcast event bus
#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl RepcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepcamError>;
