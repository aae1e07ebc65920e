//! Mock implementations for plugin tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::media_fresh::{TransferHistory, TransferRecord};
use crate::notify::{Notification, Notifier};

/// A notifier that records everything it is asked to send.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sent lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .expect("sent lock poisoned")
            .push(notification);
        Ok(())
    }
}

/// A transfer history with a fixed set of records.
#[derive(Default)]
pub struct FixedTransferHistory {
    records: Vec<TransferRecord>,
}

impl FixedTransferHistory {
    pub fn new(records: Vec<TransferRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TransferHistory for FixedTransferHistory {
    async fn recent_transfers(&self, _since: DateTime<Utc>) -> anyhow::Result<Vec<TransferRecord>> {
        Ok(self.records.clone())
    }
}
