//! Bounded status polling for remote asynchronous jobs.
//!
//! Several plugins in this workspace trigger a long-running operation on a
//! remote service (a container-image update, a media-library rescan) and get
//! back a task identifier. This crate owns the loop that tracks such a task:
//! query a status endpoint at a fixed interval, surface each intermediate
//! status, and stop on success, a recognized failure, cancellation, or an
//! attempt ceiling.
//!
//! The poller is transport-agnostic. Callers adapt their remote API into a
//! [`JobStatusSource`] and receive progress through a [`ProgressSink`].
//!
//! # Example
//!
//! ```ignore
//! use jobpoll::{poll_job, JobHandle, PollPolicy, NoProgress};
//! use tokio_util::sync::CancellationToken;
//!
//! let source = UpdateProgressSource::new(client);
//! let handle = JobHandle::new(task_id);
//! let policy = PollPolicy::new(Duration::from_secs(10), 6);
//!
//! match poll_job(&source, &handle, &policy, &NoProgress, &CancellationToken::new()).await? {
//!     PollOutcome::Success(msg) => tracing::info!("update finished: {msg}"),
//!     PollOutcome::Failure(msg) => tracing::warn!("update failed: {msg}"),
//!     PollOutcome::TimedOut => tracing::warn!("gave up waiting"),
//!     PollOutcome::Cancelled => {}
//! }
//! ```

pub mod testing;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Opaque identifier for a remote asynchronous operation.
///
/// Minted by the remote service when the operation is triggered; it has no
/// meaning once the poll loop resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One status snapshot returned by a single query.
///
/// Consumed immediately by the loop; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    /// The remote operation has finished (successfully or not).
    pub terminal: bool,
    /// Only meaningful when `terminal` is true.
    pub success: bool,
    /// Human-readable status line from the remote service.
    pub message: String,
}

impl PollStatus {
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            terminal: false,
            success: false,
            message: message.into(),
        }
    }

    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            terminal: true,
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            terminal: true,
            success: false,
            message: message.into(),
        }
    }
}

/// Configuration for one poll loop. Constant for its duration.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Sleep between non-terminal attempts. Never applied after the loop
    /// resolves.
    pub interval: Duration,
    /// Total status queries before the loop resolves to
    /// [`PollOutcome::TimedOut`]. Must be at least 1.
    pub max_attempts: u32,
    /// Consecutive failed queries tolerated before the job is declared
    /// unreachable. `None` keeps polling as long as attempts remain.
    pub max_consecutive_errors: Option<u32>,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            max_consecutive_errors: None,
        }
    }

    pub fn with_max_consecutive_errors(mut self, cap: u32) -> Self {
        self.max_consecutive_errors = Some(cap);
        self
    }

    fn validate(&self) -> Result<(), PollError> {
        if self.max_attempts == 0 {
            return Err(PollError::InvalidPolicy {
                reason: "max_attempts must be at least 1".into(),
            });
        }
        if self.interval.is_zero() {
            return Err(PollError::InvalidPolicy {
                reason: "interval must be positive".into(),
            });
        }
        if self.max_consecutive_errors == Some(0) {
            return Err(PollError::InvalidPolicy {
                reason: "max_consecutive_errors must be at least 1 when set".into(),
            });
        }
        Ok(())
    }
}

/// A single failed status query. Transient: the loop logs it and spends the
/// attempt instead of aborting.
#[derive(Debug, Error)]
#[error("status query failed: {0}")]
pub struct QueryError(String);

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// How a poll loop resolved. Timeout and remote failure are expected
/// outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The remote job reported terminal success.
    Success(String),
    /// The remote job itself reported failure. Not retried.
    Failure(String),
    /// `max_attempts` queries returned non-terminal statuses.
    TimedOut,
    /// The caller's cancellation token fired before the job finished.
    Cancelled,
}

/// Faults that prevent the loop from resolving to a [`PollOutcome`].
#[derive(Debug, Error)]
pub enum PollError {
    /// Bad policy values. The loop never starts.
    #[error("invalid poll policy: {reason}")]
    InvalidPolicy { reason: String },

    /// Too many consecutive failed queries (see
    /// [`PollPolicy::max_consecutive_errors`]).
    #[error("job unreachable after {failures} consecutive failed status queries")]
    Unreachable {
        failures: u32,
        #[source]
        last: QueryError,
    },
}

/// Adapter over a remote status endpoint.
///
/// Implementations wrap one HTTP call and translate the response body into a
/// [`PollStatus`]; transport and envelope errors become [`QueryError`].
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn query(&self, handle: &JobHandle) -> Result<PollStatus, QueryError>;
}

/// Receiver for intermediate and final status messages.
///
/// Async so implementations can forward into a notification channel.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Sink that drops every progress message.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn notify(&self, _message: &str) {}
}

/// Track a remote job until it resolves.
///
/// Runs up to `policy.max_attempts` status queries against `source`:
///
/// - a successful query emits its message through `progress`; a terminal
///   status resolves the loop to [`PollOutcome::Success`] or
///   [`PollOutcome::Failure`];
/// - a failed query spends the attempt without emitting progress and the
///   loop continues, unless `max_consecutive_errors` is set and exceeded;
/// - between attempts the loop sleeps `policy.interval`, racing the sleep
///   against `cancel` so shutdown aborts an in-flight poll promptly.
///
/// Exactly one job is tracked per invocation; the loop owns no state beyond
/// its arguments.
pub async fn poll_job(
    source: &dyn JobStatusSource,
    handle: &JobHandle,
    policy: &PollPolicy,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError> {
    policy.validate()?;

    let mut consecutive_errors = 0u32;
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            tracing::info!(job = %handle, attempt, "poll loop cancelled");
            return Ok(PollOutcome::Cancelled);
        }

        match source.query(handle).await {
            Ok(status) => {
                consecutive_errors = 0;
                progress.notify(&status.message).await;
                if status.terminal {
                    if status.success {
                        tracing::info!(job = %handle, attempt, "job finished: {}", status.message);
                        return Ok(PollOutcome::Success(status.message));
                    }
                    tracing::warn!(job = %handle, attempt, "job failed: {}", status.message);
                    return Ok(PollOutcome::Failure(status.message));
                }
                tracing::debug!(job = %handle, attempt, "job in progress: {}", status.message);
            }
            Err(err) => {
                consecutive_errors += 1;
                tracing::warn!(
                    job = %handle,
                    attempt,
                    consecutive_errors,
                    "status query failed, continuing: {err}"
                );
                if let Some(cap) = policy.max_consecutive_errors {
                    if consecutive_errors >= cap {
                        return Err(PollError::Unreachable {
                            failures: consecutive_errors,
                            last: err,
                        });
                    }
                }
            }
        }

        // No sleep once the attempt budget is spent.
        if attempt < policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job = %handle, attempt, "poll loop cancelled during wait");
                    return Ok(PollOutcome::Cancelled);
                }
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    tracing::warn!(job = %handle, attempts = policy.max_attempts, "job still running, giving up");
    Ok(PollOutcome::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_is_invalid() {
        let policy = PollPolicy::new(Duration::from_secs(1), 0);
        assert!(matches!(
            policy.validate(),
            Err(PollError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn zero_interval_is_invalid() {
        let policy = PollPolicy::new(Duration::ZERO, 5);
        assert!(matches!(
            policy.validate(),
            Err(PollError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn zero_error_cap_is_invalid() {
        let policy = PollPolicy::new(Duration::from_secs(1), 5).with_max_consecutive_errors(0);
        assert!(matches!(
            policy.validate(),
            Err(PollError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn sane_policy_validates() {
        let policy = PollPolicy::new(Duration::from_secs(10), 6).with_max_consecutive_errors(3);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn status_constructors() {
        assert!(!PollStatus::in_progress("x").terminal);
        assert!(PollStatus::succeeded("x").success);
        let failed = PollStatus::failed("x");
        assert!(failed.terminal && !failed.success);
    }
}
