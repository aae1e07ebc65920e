//! Typed errors for the ZSpace portal client.

use thiserror::Error;

/// Errors from ZSpace portal calls.
#[derive(Debug, Error)]
pub enum ZspaceError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with an unexpected code.
    #[error("ZSpace API error (code {code}): {message}")]
    Api { code: String, message: String },

    /// The configured cookie string is unusable.
    #[error("invalid portal cookie: {0}")]
    Cookie(String),
}

/// Result type alias for ZSpace operations.
pub type Result<T> = std::result::Result<T, ZspaceError>;
