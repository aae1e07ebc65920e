//! Typed errors for the DockerCopilot client.

use thiserror::Error;

/// Errors from DockerCopilot API calls.
#[derive(Debug, Error)]
pub enum DockerCopilotError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an unexpected envelope code.
    #[error("DockerCopilot API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// The auth endpoint rejected the configured secret key.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Local JWT signing failed.
    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias for DockerCopilot operations.
pub type Result<T> = std::result::Result<T, DockerCopilotError>;
