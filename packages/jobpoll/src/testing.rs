//! Testing utilities: a scripted status source and a counting progress sink.
//!
//! Useful for exercising poll loops without a remote service. Both types
//! track calls for assertions, in the spirit of the plugin tests elsewhere
//! in this workspace.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{JobHandle, JobStatusSource, PollStatus, ProgressSink, QueryError};

/// A status source that replays a fixed script of query results.
///
/// Once the script runs dry it keeps answering with a non-terminal
/// "still running" status, so over-long scripts are never required.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<PollStatus, QueryError>>>,
    queries: AtomicU32,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<PollStatus, QueryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: AtomicU32::new(0),
        }
    }

    /// Number of queries issued so far.
    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStatusSource for ScriptedSource {
    async fn query(&self, _handle: &JobHandle) -> Result<PollStatus, QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(PollStatus::in_progress("still running")))
    }
}

/// A progress sink that records every message it receives.
#[derive(Default)]
pub struct CountingSink {
    messages: Mutex<Vec<String>>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().expect("messages lock poisoned").len()
    }
}

#[async_trait]
impl ProgressSink for CountingSink {
    async fn notify(&self, message: &str) {
        self.messages
            .lock()
            .expect("messages lock poisoned")
            .push(message.to_string());
    }
}
