use thiserror::Error;

#[derive(Error, Debug)]
pub enum FirewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures at the frame source I/O boundary
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unavailable ({source_name}): {details}")]
    Unavailable { source_name: String, details: String },

    #[error("Failed to read frame: {details}")]
    Read { details: String },

    #[error("Failed to decode frame {index}: {details}")]
    Decode { index: u64, details: String },
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Sink '{sink}' failed to dispatch alarm: {details}")]
    Dispatch { sink: String, details: String },

    #[error("Sink '{sink}' timed out after {timeout_ms}ms")]
    Timeout { sink: String, timeout_ms: u64 },

    #[error("Invalid manual alarm: {details}")]
    InvalidRequest { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl FirewatchError {
    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    pub fn unavailable<S: Into<String>, D: Into<String>>(source_name: S, details: D) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FirewatchError>;
