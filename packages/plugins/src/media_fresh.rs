//! Media-library refresh plugin for ZSpace.
//!
//! On each run the plugin decides which portal libraries need a rescan —
//! either every category (flush-all mode) or the movie/TV libraries that
//! received new media recently, judged from the host's transfer history —
//! then triggers a rescan per library and tracks each rescan task to
//! completion with the job poller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobpoll::{poll_job, JobHandle, NoProgress, PollError, PollOutcome, PollPolicy};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use zspace_client::{Category, RescanStatusSource, ZspaceClient, ZspaceCookie};

use crate::error::{PluginError, Result};
use crate::notify::{Notification, Notifier};

/// Top-level media kind recorded by the host for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

/// One entry from the host's transfer history.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    /// Destination path the media landed at.
    pub dest: String,
    pub kind: MediaKind,
}

/// The host's record of recently organized media. Injected so the plugin
/// stays free of the host's database.
#[async_trait]
pub trait TransferHistory: Send + Sync {
    async fn recent_transfers(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<TransferRecord>>;
}

fn default_days() -> u32 {
    5
}

fn default_wait_secs() -> u64 {
    60
}

fn default_max_checks() -> u32 {
    30
}

/// Plugin configuration, deserialized from the host's config store.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFreshConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Portal endpoint, e.g. `http://nas:5055`.
    pub host: String,
    /// Raw browser cookie for a portal session.
    pub cookie: String,
    #[serde(default)]
    pub cron: Option<String>,
    /// Look-back window over the transfer history.
    #[serde(default = "default_days")]
    pub days: u32,
    /// Seconds between rescan status checks. Rescans are slow; the portal
    /// default is a minute.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Status checks before giving up on a rescan task.
    #[serde(default = "default_max_checks")]
    pub max_checks: u32,
    /// Portal library names holding movies.
    #[serde(default)]
    pub movie_libraries: Vec<String>,
    /// Portal library names holding TV shows.
    #[serde(default)]
    pub tv_libraries: Vec<String>,
    /// Rescan every category regardless of recent transfers.
    #[serde(default)]
    pub flush_all: bool,
    /// Only transfers under this path count as "new media".
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub run_once: bool,
}

pub struct MediaFreshPlugin {
    config: MediaFreshConfig,
    client: ZspaceClient,
    history: Arc<dyn TransferHistory>,
    notifier: Arc<dyn Notifier>,
}

impl MediaFreshPlugin {
    pub fn new(
        config: MediaFreshConfig,
        history: Arc<dyn TransferHistory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(PluginError::Config("ZSpace host must be set".into()));
        }
        let cookie = ZspaceCookie::parse(config.cookie.clone())?;
        let client = ZspaceClient::new(config.host.clone(), cookie);
        Ok(Self {
            config,
            client,
            history,
            notifier,
        })
    }

    pub fn config(&self) -> &MediaFreshConfig {
        &self.config
    }

    /// Rescan the libraries that need it, tracking each rescan task.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<()> {
        let targets = if self.config.flush_all {
            None
        } else {
            let names = self.recent_targets().await?;
            if names.is_empty() {
                tracing::info!(
                    days = self.config.days,
                    "no recent transfers under the configured path, nothing to refresh"
                );
                return Ok(());
            }
            Some(names)
        };

        let categories = self.client.categories().await?;
        let selected = select_categories(&categories, targets.as_deref());
        tracing::info!(count = selected.len(), "libraries to rescan");

        for category in selected {
            if cancel.is_cancelled() {
                tracing::info!("refresh interrupted by shutdown");
                break;
            }
            self.rescan_one(category, cancel).await?;
        }
        Ok(())
    }

    async fn rescan_one(&self, category: &Category, cancel: &CancellationToken) -> Result<()> {
        let task = match self.client.trigger_rescan(&category.id).await {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(library = %category.name, "rescan trigger failed: {e}");
                return Ok(());
            }
        };

        let started = Instant::now();
        let source = RescanStatusSource::new(self.client.clone(), category.id.clone());
        let handle = JobHandle::new(task.task_id);
        let policy = PollPolicy::new(
            Duration::from_secs(self.config.wait_secs),
            self.config.max_checks,
        );

        match poll_job(&source, &handle, &policy, &NoProgress, cancel).await {
            Ok(PollOutcome::Success(message)) => {
                let elapsed = started.elapsed().as_secs();
                tracing::info!(library = %category.name, elapsed, "{message}");
                if self.config.notify {
                    self.send(
                        "Library refresh",
                        format!("{}: {message}\nelapsed: {elapsed}s", category.name),
                    )
                    .await;
                }
            }
            Ok(PollOutcome::Failure(message)) => {
                tracing::warn!(library = %category.name, "{message}");
                if self.config.notify {
                    self.send(
                        "Library refresh failed",
                        format!("{}: {message}", category.name),
                    )
                    .await;
                }
            }
            Ok(PollOutcome::TimedOut) => {
                tracing::warn!(
                    library = %category.name,
                    checks = self.config.max_checks,
                    "rescan still running, no longer tracking"
                );
            }
            Ok(PollOutcome::Cancelled) => {
                tracing::info!(library = %category.name, "rescan tracking cancelled");
            }
            Err(e @ PollError::InvalidPolicy { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(library = %category.name, "rescan tracking aborted: {e}");
            }
        }
        Ok(())
    }

    /// Library names with new media under the configured path.
    async fn recent_targets(&self) -> Result<Vec<String>> {
        let prefix = self
            .config
            .path_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                PluginError::Config("path_prefix must be set unless flush_all is on".into())
            })?;

        let since = Utc::now() - chrono::Duration::days(i64::from(self.config.days));
        let records = self
            .history
            .recent_transfers(since)
            .await
            .map_err(PluginError::History)?;

        Ok(libraries_to_refresh(
            &records,
            prefix,
            &self.config.movie_libraries,
            &self.config.tv_libraries,
        ))
    }

    async fn send(&self, title: &str, text: String) {
        if let Err(e) = self.notifier.notify(Notification::new(title, text)).await {
            tracing::warn!("notification failed: {e}");
        }
    }
}

/// Libraries to rescan for the given transfers: the movie libraries when a
/// movie landed under `prefix`, the TV libraries likewise.
fn libraries_to_refresh(
    records: &[TransferRecord],
    prefix: &str,
    movie_libraries: &[String],
    tv_libraries: &[String],
) -> Vec<String> {
    let matching: Vec<&TransferRecord> = records
        .iter()
        .filter(|r| r.dest.starts_with(prefix))
        .collect();

    let mut libraries = Vec::new();
    if matching.iter().any(|r| r.kind == MediaKind::Movie) {
        libraries.extend(movie_libraries.iter().cloned());
    }
    if matching.iter().any(|r| r.kind == MediaKind::Tv) {
        libraries.extend(tv_libraries.iter().cloned());
    }
    libraries
}

/// Resolve target names against the portal's category list. `None` selects
/// everything; unknown names are skipped with a log line.
fn select_categories<'a>(categories: &'a [Category], targets: Option<&[String]>) -> Vec<&'a Category> {
    match targets {
        None => categories.iter().collect(),
        Some(names) => names
            .iter()
            .filter_map(|name| {
                let found = categories.iter().find(|c| &c.name == name);
                if found.is_none() {
                    tracing::info!(library = %name, "not a portal category, skipping");
                }
                found
            })
            .collect(),
    }
}
