//! Error types for the dummy backend

use thiserror::Error;

/// Dummy backend configuration errors
#[derive(Debug, Error)]
pub enum DummyError {
    /// Topology string could not be parsed
    #[error("Invalid topology entry '{entry}': {message}")]
    InvalidTopology { entry: String, message: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Result type for dummy backend configuration
pub type Result<T> = std::result::Result<T, DummyError>;
