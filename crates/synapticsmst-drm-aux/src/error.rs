//! Error types for drm_dp_aux access

use thiserror::Error;

/// drm_dp_aux backend errors
#[derive(Debug, Error)]
pub enum DrmAuxError {
    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Device directory does not exist
    #[error("Device directory {0} does not exist")]
    NoDirectory(String),
}

/// Result type for drm_dp_aux backend setup
pub type Result<T> = std::result::Result<T, DrmAuxError>;
