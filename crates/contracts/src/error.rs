//! Layered error definitions
//!
//! Categorized by source: config / channel / store

use thiserror::Error;

/// Unified contract error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Channel Errors =====
    /// Malformed channel definition
    #[error("invalid channel '{channel}': {message}")]
    InvalidChannel { channel: String, message: String },

    /// Channel key already used by `owner`
    #[error("duplicate channel '{channel}' (already registered on '{owner}')")]
    DuplicateChannel { channel: String, owner: String },

    // ===== Store Errors =====
    /// Store queue at capacity, row rejected
    #[error("store queue full (capacity {capacity}), row dropped")]
    StoreQueueFull { capacity: usize },

    /// Store queue closed
    #[error("store queue closed")]
    StoreClosed,

    /// Store cache read/write failure
    #[error("store cache error: {message}")]
    StoreCache { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid channel error
    pub fn invalid_channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidChannel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create duplicate channel error
    pub fn duplicate_channel(channel: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::DuplicateChannel {
            channel: channel.into(),
            owner: owner.into(),
        }
    }

    /// Create store cache error
    pub fn store_cache(message: impl Into<String>) -> Self {
        Self::StoreCache {
            message: message.into(),
        }
    }

    /// True for failures raised by a [`crate::DataStore`]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreQueueFull { .. } | Self::StoreClosed | Self::StoreCache { .. } | Self::Io(_)
        )
    }
}
