//! End-to-end flow of a tracked job: poll loop driving progress
//! notifications through the shared channel.

use std::sync::Arc;
use std::time::Duration;

use jobpoll::testing::ScriptedSource;
use jobpoll::{poll_job, JobHandle, PollOutcome, PollPolicy, PollStatus, QueryError};
use mp_plugins::testing::MockNotifier;
use mp_plugins::NotifierProgress;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn tracked_update_posts_one_notification_per_status() {
    let source = ScriptedSource::new(vec![
        Ok(PollStatus::in_progress("pulling image")),
        Ok(PollStatus::in_progress("recreating container")),
        Ok(PollStatus::succeeded("更新成功")),
    ]);
    let notifier = Arc::new(MockNotifier::new());
    let sink = NotifierProgress::new(notifier.clone(), "Container update progress", "jellyfin");
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let outcome = poll_job(
        &source,
        &JobHandle::new("task-7"),
        &policy,
        &sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::Success("更新成功".into()));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|n| n.title == "Container update progress"));
    assert_eq!(sent[0].text, "jellyfin\npulling image");
    assert_eq!(sent[2].text, "jellyfin\n更新成功");
}

#[tokio::test(start_paused = true)]
async fn failed_status_queries_produce_no_notifications() {
    let source = ScriptedSource::new(vec![
        Err(QueryError::new("bad gateway")),
        Ok(PollStatus::succeeded("更新成功")),
    ]);
    let notifier = Arc::new(MockNotifier::new());
    let sink = NotifierProgress::new(notifier.clone(), "Container update progress", "radarr");
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let outcome = poll_job(
        &source,
        &JobHandle::new("task-8"),
        &policy,
        &sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::Success("更新成功".into()));
    assert_eq!(notifier.sent().len(), 1);
}
