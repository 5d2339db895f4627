//! Error types for the FIN engine

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Payload or header failed field validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Lifecycle transition rejected
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

/// Complete list of validation errors for one assembly attempt.
///
/// `valid` is always `false`; it is kept so the serialized form reads
/// `{ "valid": false, "errors": [...] }` for callers that render it directly.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{} validation error(s): {}", .errors.len(), summarize(.errors))]
pub struct ValidationFailure {
    /// Always false
    pub valid: bool,

    /// Every error found, in field order
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    /// Wrap a non-empty error list
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Error messages as plain strings
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// True if any error is reported on `field` with `code`
    pub fn has(&self, field: &str, code: crate::validation::ValidationCode) -> bool {
        self.errors.iter().any(|e| e.field == field && e.code == code)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    /// Event is not legal from the current status
    #[error("INVALID_TRANSITION: cannot apply '{event}' in status '{from}'")]
    InvalidTransition {
        /// Status the message was in
        from: String,
        /// Rejected event name
        event: String,
    },

    /// Approvals do not come from two distinct, positive approver ids
    #[error("FOUR_EYES_VIOLATION: {0}")]
    FourEyesViolation(String),

    /// Message carries the repair flag and must be corrected first
    #[error("REPAIR_REQUIRED: message must be repaired and re-validated first")]
    RepairRequired,

    /// Validation ran as part of the transition and failed
    #[error("VALIDATION_FAILED: {0}")]
    Validation(ValidationFailure),

    /// A network report is append-only and already present
    #[error("REPORT_ALREADY_ATTACHED: network report already recorded")]
    ReportAlreadyAttached,
}

impl LifecycleError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::FourEyesViolation(_) => "FOUR_EYES_VIOLATION",
            LifecycleError::RepairRequired => "REPAIR_REQUIRED",
            LifecycleError::Validation(_) => "VALIDATION_FAILED",
            LifecycleError::ReportAlreadyAttached => "REPORT_ALREADY_ATTACHED",
        }
    }

    pub(crate) fn invalid(from: impl ToString, event: &str) -> Self {
        LifecycleError::InvalidTransition {
            from: from.to_string(),
            event: event.to_string(),
        }
    }
}
