//! Error types for observable-link
//!
//! Only setup and `subscribe` failures travel through these types.  Once a
//! connection has been handed to a subscription, transport failures are
//! retried locally and reported through logs and
//! [`EventHandlers`](crate::EventHandlers), never as `Err`.

use thiserror::Error;

/// Errors that can occur while building clients, routes or subscriptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservableLinkError {
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Subscribe failed: {0}")]
    SubscribeError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for ObservableLinkError {
    fn from(err: serde_json::Error) -> Self {
        ObservableLinkError::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ObservableLinkError {
    fn from(err: url::ParseError) -> Self {
        ObservableLinkError::ConfigurationError(err.to_string())
    }
}

/// Result type for observable-link operations
pub type Result<T> = std::result::Result<T, ObservableLinkError>;
