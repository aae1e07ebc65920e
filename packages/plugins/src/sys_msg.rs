//! System-message forwarding plugin for ZSpace.
//!
//! Pulls the newest `notify`-type messages from the NAS and reposts each
//! one through the host's notification channel.

use std::sync::Arc;

use serde::Deserialize;
use zspace_client::{SystemMessage, ZspaceClient, ZspaceCookie};

use crate::error::{PluginError, Result};
use crate::notify::{Notification, Notifier};

fn default_fetch_count() -> u32 {
    20
}

/// Plugin configuration, deserialized from the host's config store.
#[derive(Debug, Clone, Deserialize)]
pub struct SysMsgConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Portal endpoint, e.g. `http://nas:5055`.
    pub host: String,
    /// Raw browser cookie for a portal session.
    pub cookie: String,
    #[serde(default)]
    pub cron: Option<String>,
    /// Messages fetched per run.
    #[serde(default = "default_fetch_count")]
    pub fetch_count: u32,
    #[serde(default)]
    pub run_once: bool,
}

pub struct SysMsgPlugin {
    config: SysMsgConfig,
    client: ZspaceClient,
    notifier: Arc<dyn Notifier>,
}

impl SysMsgPlugin {
    pub fn new(config: SysMsgConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(PluginError::Config("ZSpace host must be set".into()));
        }
        let cookie = ZspaceCookie::parse(config.cookie.clone())?;
        let client = ZspaceClient::new(config.host.clone(), cookie);
        Ok(Self {
            config,
            client,
            notifier,
        })
    }

    pub fn config(&self) -> &SysMsgConfig {
        &self.config
    }

    /// Forward the newest system messages.
    ///
    /// TODO: remember the newest forwarded message id and pass it as
    /// `start_id` so a run never reposts the previous page.
    pub async fn push_messages(&self) -> Result<()> {
        let messages = self.client.system_messages(self.config.fetch_count).await?;
        tracing::debug!(count = messages.len(), "system messages fetched");

        for message in &messages {
            if let Err(e) = self
                .notifier
                .notify(render_message(message))
                .await
            {
                tracing::warn!("notification failed: {e}");
            }
        }
        Ok(())
    }
}

fn render_message(message: &SystemMessage) -> Notification {
    Notification::new(
        "NAS system message",
        format!("{}\ntime: {}", message.content, message.created_at),
    )
}
