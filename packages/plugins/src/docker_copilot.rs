//! Container-update plugin backed by DockerCopilot.
//!
//! Three scheduled entry points, mirroring the cron slots the host exposes:
//! [`DockerCopilotPlugin::notify_updatable`] announces available image
//! updates for watched containers, [`DockerCopilotPlugin::auto_update`]
//! applies updates to a selected set (optionally pruning unused images
//! first and tracking each update task), and
//! [`DockerCopilotPlugin::backup`] triggers a container-definition backup.

use std::sync::Arc;
use std::time::Duration;

use docker_copilot_client::{ContainerSummary, DockerCopilotClient, UpdateProgressSource};
use jobpoll::{poll_job, JobHandle, PollError, PollOutcome, PollPolicy};
use secrecy::SecretString;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{PluginError, Result};
use crate::notify::{Notification, Notifier, NotifierProgress};

fn default_poll_interval() -> u64 {
    10
}

fn default_poll_attempts() -> u32 {
    6
}

/// Plugin configuration, deserialized from the host's config store.
#[derive(Debug, Clone, Deserialize)]
pub struct DockerCopilotConfig {
    #[serde(default)]
    pub enabled: bool,
    /// DockerCopilot endpoint, e.g. `http://nas:12712`.
    pub host: String,
    pub secret_key: String,
    /// Cron slot for the update-available notification run.
    #[serde(default)]
    pub update_cron: Option<String>,
    /// Container names to announce updates for.
    #[serde(default)]
    pub watched: Vec<String>,
    /// Cron slot for the auto-update run.
    #[serde(default)]
    pub auto_update_cron: Option<String>,
    /// Container names to update automatically.
    #[serde(default)]
    pub auto_update: Vec<String>,
    /// Track each update task and post its progress.
    #[serde(default)]
    pub report_progress: bool,
    /// Remove tagged-but-unused images before updating.
    #[serde(default)]
    pub prune_images: bool,
    /// Cron slot for the backup run.
    #[serde(default)]
    pub backup_cron: Option<String>,
    #[serde(default)]
    pub notify_backup: bool,
    /// Seconds between update-progress checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Progress checks before giving up on a task.
    #[serde(default = "default_poll_attempts")]
    pub poll_max_attempts: u32,
    /// Run every configured entry point once, shortly after startup.
    #[serde(default)]
    pub run_once: bool,
}

pub struct DockerCopilotPlugin {
    config: DockerCopilotConfig,
    client: DockerCopilotClient,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for DockerCopilotPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCopilotPlugin")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DockerCopilotPlugin {
    pub fn new(config: DockerCopilotConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        if config.host.trim().is_empty() || config.secret_key.trim().is_empty() {
            return Err(PluginError::Config(
                "DockerCopilot host and secret_key must both be set".into(),
            ));
        }
        let client = DockerCopilotClient::new(
            config.host.clone(),
            SecretString::from(config.secret_key.clone()),
        );
        Ok(Self {
            config,
            client,
            notifier,
        })
    }

    pub fn config(&self) -> &DockerCopilotConfig {
        &self.config
    }

    /// Announce available image updates for watched containers.
    pub async fn notify_updatable(&self) -> Result<()> {
        let containers = self.client.containers().await?;
        let updatable = updatable_in(&containers, &self.config.watched);
        tracing::info!(count = updatable.len(), "containers with updates among watched");

        for container in updatable {
            self.send(
                "Container update available",
                format!(
                    "{}\ncurrent image: {}\nstate: {} {}\nbuilt: {}",
                    container.name,
                    container.using_image,
                    container.status,
                    container.running_time,
                    container.create_time
                ),
            )
            .await;
        }
        Ok(())
    }

    /// Update every selected container that has a newer image, one at a
    /// time. Update tasks are tracked sequentially, never concurrently.
    pub async fn auto_update(&self, cancel: &CancellationToken) -> Result<()> {
        if self.config.prune_images {
            self.prune_unused_images().await;
        }

        let containers = self.client.containers().await?;
        for container in updatable_in(&containers, &self.config.auto_update) {
            if cancel.is_cancelled() {
                tracing::info!("auto-update interrupted by shutdown");
                break;
            }

            let task = match self.client.trigger_update(container).await {
                Ok(task) => task,
                Err(e) => {
                    tracing::warn!(container = %container.name, "update trigger failed: {e}");
                    continue;
                }
            };
            self.send(
                "Container update",
                format!("{}\nupdate task created", container.name),
            )
            .await;

            if self.config.report_progress {
                self.track_update(&container.name, &task.task_id, cancel)
                    .await?;
            }
        }
        Ok(())
    }

    /// Trigger a backup of the container definitions.
    pub async fn backup(&self) -> Result<()> {
        match self.client.backup().await {
            Ok(()) => {
                tracing::info!("container backup finished");
                if self.config.notify_backup {
                    self.send("Backup finished", "Container definitions backed up.".to_string())
                        .await;
                }
                Ok(())
            }
            Err(e) => {
                if self.config.notify_backup {
                    self.send("Backup failed", format!("Container backup failed:\n{e}"))
                        .await;
                }
                Err(e.into())
            }
        }
    }

    /// Best effort: a failed removal never blocks the update pass.
    async fn prune_unused_images(&self) {
        let images = match self.client.images().await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!("image list unavailable, skipping prune: {e}");
                return;
            }
        };
        for image in images.iter().filter(|i| i.is_prunable()) {
            if let Err(e) = self.client.remove_image(&image.id).await {
                tracing::warn!(image = %image.id, "image removal failed: {e}");
            }
        }
    }

    async fn track_update(
        &self,
        container_name: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let source = UpdateProgressSource::new(self.client.clone());
        let handle = JobHandle::new(task_id);
        let policy = PollPolicy::new(
            Duration::from_secs(self.config.poll_interval_secs),
            self.config.poll_max_attempts,
        );
        let sink =
            NotifierProgress::new(self.notifier.clone(), "Container update progress", container_name);

        match poll_job(&source, &handle, &policy, &sink, cancel).await {
            Ok(PollOutcome::Success(_)) => {}
            Ok(PollOutcome::Failure(message)) => {
                tracing::warn!(container = container_name, "update task failed: {message}");
            }
            Ok(PollOutcome::TimedOut) => {
                tracing::warn!(
                    container = container_name,
                    checks = self.config.poll_max_attempts,
                    "update task still running, no longer tracking"
                );
            }
            Ok(PollOutcome::Cancelled) => {
                tracing::info!(container = container_name, "update tracking cancelled");
            }
            // A misconfigured policy would fail every run the same way.
            Err(e @ PollError::InvalidPolicy { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(container = container_name, "update tracking aborted: {e}");
            }
        }
        Ok(())
    }

    async fn send(&self, title: &str, text: String) {
        if let Err(e) = self.notifier.notify(Notification::new(title, text)).await {
            tracing::warn!("notification failed: {e}");
        }
    }
}

/// Containers with a pending update whose name is in `selected`.
fn updatable_in<'a>(
    containers: &'a [ContainerSummary],
    selected: &[String],
) -> Vec<&'a ContainerSummary> {
    containers
        .iter()
        .filter(|c| c.have_update && selected.iter().any(|name| name == &c.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockNotifier;

    fn container(name: &str, have_update: bool) -> ContainerSummary {
        ContainerSummary {
            id: format!("id-{name}"),
            name: name.to_string(),
            have_update,
            using_image: format!("{name}:latest"),
            status: "running".into(),
            running_time: "2 days".into(),
            create_time: "2024-05-01".into(),
        }
    }

    #[test]
    fn selection_requires_update_and_membership() {
        let containers = vec![
            container("jellyfin", true),
            container("sonarr", false),
            container("radarr", true),
        ];
        let selected = vec!["jellyfin".to_string(), "sonarr".to_string()];

        let picked = updatable_in(&containers, &selected);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "jellyfin");
    }

    #[test]
    fn config_defaults_apply() {
        let config: DockerCopilotConfig = serde_json::from_str(
            r#"{"host": "http://nas:12712", "secret_key": "s3cret"}"#,
        )
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.poll_max_attempts, 6);
        assert!(config.watched.is_empty());
        assert!(!config.report_progress);
    }

    #[test]
    fn empty_host_is_rejected() {
        let config: DockerCopilotConfig =
            serde_json::from_str(r#"{"host": " ", "secret_key": "s3cret"}"#).unwrap();
        let err = DockerCopilotPlugin::new(config, Arc::new(MockNotifier::new())).unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }
}
