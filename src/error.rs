//! Error types for the flood control gate.

use thiserror::Error;

/// Main error type for flood control operations.
#[derive(Error, Debug)]
pub enum FloodControlError {
    /// The caller's context was cancelled before the check ran
    #[error("Check cancelled by caller")]
    Cancelled,

    /// The caller's deadline had already passed when the check was made
    #[error("Check deadline exceeded")]
    DeadlineExceeded,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FloodControlError {
    /// Whether this error came from the caller's context rather than the gate.
    ///
    /// Such an error means the decision is unknown; callers must not treat it
    /// as either an admit or a reject.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<config::ConfigError> for FloodControlError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for flood control operations.
pub type Result<T> = std::result::Result<T, FloodControlError>;
