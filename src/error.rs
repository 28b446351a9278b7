//! Custom error types for ciniiwatch.
//!
//! This module defines all error types used throughout the application.
//! Any fetch failure is fatal for the invocation: there is no retry layer,
//! and a failed run leaves the persisted cursor and store untouched.

use thiserror::Error;

/// Main error type for ciniiwatch operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Missing or invalid configuration (detected before any network call)
    #[error("Config error: {0}")]
    Config(String),

    /// Search endpoint returned a non-2xx status
    #[error("Feed fetch failed: HTTP {status}")]
    Transport {
        /// HTTP status code from the endpoint
        status: u16,
    },

    /// Response body was HTML rather than a structured feed
    /// (usually a misconfigured query or an auth failure)
    #[error("Feed fetch returned HTML, not a feed: {0}")]
    UnexpectedContent(String),

    /// Feed body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Notifier delivery error
    #[error("Notify error: {0}")]
    Notify(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular store error
    #[error("Store error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using `WatchError`
pub type Result<T> = std::result::Result<T, WatchError>;
