//! Error types for the cloudmirror library.

use thiserror::Error;

/// Main error type for mirror operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Network request error.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP-level failure, with the response body as the message.
    #[error("API error: {code} - {message}")]
    Api { code: u16, message: String },

    /// Provider reported a non-OK status in an otherwise well-formed response.
    #[error("provider error: {0}")]
    Provider(String),

    /// The destination reported a different byte count than the source records.
    ///
    /// The transferred content is silently corrupted; the whole run is aborted
    /// rather than just the current entry.
    #[error("size mismatch for '{path}': destination has {actual} bytes, source has {expected}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Entry or parent could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid or unexpected response from a provider.
    #[error("invalid response from server")]
    InvalidResponse,

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for cloudmirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;
