//! Plugin-level errors.

use thiserror::Error;

/// Errors surfaced by a plugin run.
///
/// Runs are invoked from a scheduler; callers log these rather than
/// propagate them, so one bad run never takes the host down.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Missing or inconsistent plugin configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    DockerCopilot(#[from] docker_copilot_client::DockerCopilotError),

    #[error(transparent)]
    Zspace(#[from] zspace_client::ZspaceError),

    #[error(transparent)]
    Poll(#[from] jobpoll::PollError),

    /// The injected transfer-history source failed.
    #[error("transfer history error: {0}")]
    History(anyhow::Error),
}

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
