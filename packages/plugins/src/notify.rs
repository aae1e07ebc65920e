//! The shared notification channel.
//!
//! The host owns the real delivery mechanism (chat bots, push services);
//! plugins only see the [`Notifier`] trait. [`NotifierProgress`] bridges the
//! channel into `jobpoll`'s progress callback so poll loops can report
//! intermediate job status to the user.

use std::sync::Arc;

use async_trait::async_trait;
use jobpoll::ProgressSink;

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub text: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// The host's notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Notifier that only writes to the log. Useful for demos and dry runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        tracing::info!(title = %notification.title, "{}", notification.text);
        Ok(())
    }
}

/// Adapts a [`Notifier`] into a poll-loop progress sink, posting every
/// status message under a fixed title.
pub struct NotifierProgress {
    notifier: Arc<dyn Notifier>,
    title: String,
    prefix: String,
}

impl NotifierProgress {
    /// `prefix` is prepended to every message, typically the job's subject
    /// (a container or library name).
    pub fn new(notifier: Arc<dyn Notifier>, title: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            notifier,
            title: title.into(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ProgressSink for NotifierProgress {
    async fn notify(&self, message: &str) {
        let notification = Notification::new(
            self.title.clone(),
            format!("{}\n{}", self.prefix, message),
        );
        // A dropped progress message is not worth failing the poll loop over.
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!("progress notification failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockNotifier;

    #[tokio::test]
    async fn progress_messages_carry_title_and_prefix() {
        let notifier = Arc::new(MockNotifier::new());
        let sink = NotifierProgress::new(notifier.clone(), "Container update", "jellyfin");

        sink.notify("pulling image").await;
        sink.notify("update finished").await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].title, "Container update");
        assert_eq!(sent[0].text, "jellyfin\npulling image");
        assert_eq!(sent[1].text, "jellyfin\nupdate finished");
    }
}
