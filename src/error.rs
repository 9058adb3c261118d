//! Error types for the guided tour.
//!
//! Nothing in here is fatal to the host page: callers log and degrade.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Completion notify error: {0}")]
    Notify(#[from] NotifyError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Durable key-value store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Step catalog errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Step catalog is empty")]
    Empty,

    #[error("Step index {index} out of range (catalog has {len} steps)")]
    OutOfRange { index: usize, len: usize },

    #[error("Step {index} ({mode}) needs a target selector")]
    MissingTarget { index: usize, mode: &'static str },
}

/// Errors from the outbound completion callback.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Completion request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Completion endpoint {endpoint} rejected the request with status {status}")]
    Rejected { endpoint: String, status: u16 },
}

/// Result type alias for the tour.
pub type Result<T> = std::result::Result<T, Error>;
