//! Error types for the gateway

use fin_engine::{LifecycleError, ValidationFailure};
use thiserror::Error;
use uuid::Uuid;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No outbound message with this id
    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    /// No inbound message with this id
    #[error("Incoming message not found: {0}")]
    IncomingNotFound(Uuid),

    /// Content can no longer be edited
    #[error("Message {id} is not editable in status '{status}'")]
    NotEditable {
        /// Message id
        id: Uuid,
        /// Current status
        status: String,
    },

    /// Payload or header failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Lifecycle transition rejected
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Engine error (configuration, IO)
    #[error("Engine error: {0}")]
    Engine(#[from] fin_engine::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MessageNotFound(_) | GatewayError::IncomingNotFound(_) => "NOT_FOUND",
            GatewayError::NotEditable { .. } => "NOT_EDITABLE",
            GatewayError::Validation(_) => "VALIDATION_FAILED",
            GatewayError::Lifecycle(e) => e.code(),
            GatewayError::Engine(_) | GatewayError::Config(_) => "CONFIG_ERROR",
            GatewayError::Metrics(_) | GatewayError::Serialization(_) | GatewayError::Io(_) => "INTERNAL_ERROR",
        }
    }
}
