//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Command-line argument out of range
    #[error("Invalid argument --{name}: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// Sampling loop gave up on the store
    #[error("Acquisition '{process}' aborted: {reason}")]
    AcquisitionAborted { process: String, reason: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    pub fn acquisition_aborted(process: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AcquisitionAborted {
            process: process.into(),
            reason: reason.into(),
        }
    }
}
