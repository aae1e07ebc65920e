//! Cron wiring for plugin runs.
//!
//! The host usually owns scheduling; this runner exists for standalone
//! deployments. Each enabled plugin entry point is registered with
//! `tokio_cron_scheduler` under its configured cron slot (six-field
//! expressions, seconds first), and `run_once` fires every configured
//! entry point shortly after startup.
//!
//! Failures of a run are logged and never propagate: one bad run must not
//! take the scheduler down. Shutdown cancels the shared token so in-flight
//! poll loops abort promptly instead of draining their attempt budget.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::docker_copilot::DockerCopilotPlugin;
use crate::media_fresh::MediaFreshPlugin;
use crate::sys_msg::SysMsgPlugin;

/// Delay before `run_once` executions fire after registration.
const RUN_ONCE_DELAY: Duration = Duration::from_secs(3);

pub struct PluginRunner {
    scheduler: JobScheduler,
    cancel: CancellationToken,
}

impl PluginRunner {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            scheduler: JobScheduler::new().await?,
            cancel: CancellationToken::new(),
        })
    }

    /// Token shared with every poll loop the plugins start.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn register_docker_copilot(&self, plugin: Arc<DockerCopilotPlugin>) -> Result<()> {
        let config = plugin.config().clone();

        if config.enabled {
            if let Some(cron) = &config.update_cron {
                let p = plugin.clone();
                let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                    let p = p.clone();
                    Box::pin(async move {
                        if let Err(e) = p.notify_updatable().await {
                            tracing::error!("update-notification run failed: {e}");
                        }
                    })
                })?;
                self.scheduler.add(job).await?;
            }

            if let Some(cron) = &config.auto_update_cron {
                let p = plugin.clone();
                let cancel = self.cancel.clone();
                let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                    let p = p.clone();
                    let cancel = cancel.clone();
                    Box::pin(async move {
                        if let Err(e) = p.auto_update(&cancel).await {
                            tracing::error!("auto-update run failed: {e}");
                        }
                    })
                })?;
                self.scheduler.add(job).await?;
            }

            if let Some(cron) = &config.backup_cron {
                let p = plugin.clone();
                let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                    let p = p.clone();
                    Box::pin(async move {
                        if let Err(e) = p.backup().await {
                            tracing::error!("backup run failed: {e}");
                        }
                    })
                })?;
                self.scheduler.add(job).await?;
            }
        }

        if config.run_once {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(RUN_ONCE_DELAY).await;
                if plugin.config().update_cron.is_some() {
                    if let Err(e) = plugin.notify_updatable().await {
                        tracing::error!("one-off update notification failed: {e}");
                    }
                }
                if plugin.config().auto_update_cron.is_some() {
                    if let Err(e) = plugin.auto_update(&cancel).await {
                        tracing::error!("one-off auto-update failed: {e}");
                    }
                }
                if plugin.config().backup_cron.is_some() {
                    if let Err(e) = plugin.backup().await {
                        tracing::error!("one-off backup failed: {e}");
                    }
                }
            });
        }
        Ok(())
    }

    pub async fn register_media_fresh(&self, plugin: Arc<MediaFreshPlugin>) -> Result<()> {
        let config = plugin.config().clone();

        if config.enabled {
            if let Some(cron) = &config.cron {
                let p = plugin.clone();
                let cancel = self.cancel.clone();
                let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                    let p = p.clone();
                    let cancel = cancel.clone();
                    Box::pin(async move {
                        if let Err(e) = p.refresh(&cancel).await {
                            tracing::error!("library refresh run failed: {e}");
                        }
                    })
                })?;
                self.scheduler.add(job).await?;
            }
        }

        if config.run_once {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(RUN_ONCE_DELAY).await;
                if let Err(e) = plugin.refresh(&cancel).await {
                    tracing::error!("one-off library refresh failed: {e}");
                }
            });
        }
        Ok(())
    }

    pub async fn register_sys_msg(&self, plugin: Arc<SysMsgPlugin>) -> Result<()> {
        let config = plugin.config().clone();

        if config.enabled {
            if let Some(cron) = &config.cron {
                let p = plugin.clone();
                let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                    let p = p.clone();
                    Box::pin(async move {
                        if let Err(e) = p.push_messages().await {
                            tracing::error!("message-forwarding run failed: {e}");
                        }
                    })
                })?;
                self.scheduler.add(job).await?;
            }
        }

        if config.run_once {
            tokio::spawn(async move {
                tokio::time::sleep(RUN_ONCE_DELAY).await;
                if let Err(e) = plugin.push_messages().await {
                    tracing::error!("one-off message forwarding failed: {e}");
                }
            });
        }
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        tracing::info!("plugin scheduler started");
        Ok(())
    }

    /// Cancel in-flight poll loops and stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.scheduler.shutdown().await?;
        Ok(())
    }
}
