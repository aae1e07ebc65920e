//! Behavioral tests for the poll loop: attempt accounting, sleep placement,
//! transient-error tolerance, and cancellation.

use std::time::Duration;

use jobpoll::testing::{CountingSink, ScriptedSource};
use jobpoll::{poll_job, JobHandle, PollError, PollOutcome, PollPolicy, PollStatus, QueryError};
use tokio_util::sync::CancellationToken;

fn handle() -> JobHandle {
    JobHandle::new("task-42")
}

fn running() -> Result<PollStatus, QueryError> {
    Ok(PollStatus::in_progress("pulling image"))
}

#[tokio::test(start_paused = true)]
async fn always_non_terminal_times_out_after_max_attempts() {
    let source = ScriptedSource::new(vec![running(), running(), running(), running()]);
    let sink = CountingSink::new();
    let policy = PollPolicy::new(Duration::from_secs(10), 4);

    let start = tokio::time::Instant::now();
    let outcome = poll_job(&source, &handle(), &policy, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::TimedOut);
    assert_eq!(source.queries(), 4);
    assert_eq!(sink.count(), 4);
    // Sleeps happen between attempts only: 3 of them for 4 attempts.
    assert_eq!(start.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn terminal_success_stops_early_without_trailing_sleep() {
    let source = ScriptedSource::new(vec![
        running(),
        running(),
        Ok(PollStatus::succeeded("update finished")),
    ]);
    let sink = CountingSink::new();
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let start = tokio::time::Instant::now();
    let outcome = poll_job(&source, &handle(), &policy, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Success("update finished".into()));
    assert_eq!(source.queries(), 3);
    assert_eq!(sink.count(), 3);
    assert_eq!(sink.messages().last().unwrap(), "update finished");
    // Two sleeps before the terminal query, none after it.
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn terminal_failure_on_first_attempt_resolves_immediately() {
    let source = ScriptedSource::new(vec![Ok(PollStatus::failed("update failed"))]);
    let sink = CountingSink::new();
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let start = tokio::time::Instant::now();
    let outcome = poll_job(&source, &handle(), &policy, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Failure("update failed".into()));
    assert_eq!(source.queries(), 1);
    assert_eq!(sink.count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn zero_max_attempts_is_rejected_before_any_query() {
    let source = ScriptedSource::new(vec![running()]);
    let policy = PollPolicy::new(Duration::from_secs(10), 0);

    let err = poll_job(
        &source,
        &handle(),
        &policy,
        &jobpoll::NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PollError::InvalidPolicy { .. }));
    assert_eq!(source.queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_query_errors_do_not_abort_the_loop() {
    let source = ScriptedSource::new(vec![
        Err(QueryError::new("connection refused")),
        Err(QueryError::new("connection refused")),
        Ok(PollStatus::succeeded("update finished")),
    ]);
    let sink = CountingSink::new();
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let outcome = poll_job(&source, &handle(), &policy, &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Success("update finished".into()));
    assert_eq!(source.queries(), 3);
    // Failed queries emit no progress.
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn consecutive_error_cap_declares_the_job_unreachable() {
    let source = ScriptedSource::new(vec![
        Err(QueryError::new("timeout")),
        Err(QueryError::new("timeout")),
        Err(QueryError::new("timeout")),
        Ok(PollStatus::succeeded("never reached")),
    ]);
    let policy = PollPolicy::new(Duration::from_secs(10), 10).with_max_consecutive_errors(3);

    let err = poll_job(
        &source,
        &handle(),
        &policy,
        &jobpoll::NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PollError::Unreachable { failures: 3, .. }));
    assert_eq!(source.queries(), 3);
}

#[tokio::test(start_paused = true)]
async fn successful_query_resets_the_consecutive_error_count() {
    let source = ScriptedSource::new(vec![
        Err(QueryError::new("timeout")),
        running(),
        Err(QueryError::new("timeout")),
        running(),
        Err(QueryError::new("timeout")),
        Ok(PollStatus::succeeded("done")),
    ]);
    let policy = PollPolicy::new(Duration::from_secs(10), 10).with_max_consecutive_errors(2);

    let outcome = poll_job(
        &source,
        &handle(),
        &policy,
        &jobpoll::NoProgress,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::Success("done".into()));
    assert_eq!(source.queries(), 6);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_token_aborts_before_the_first_query() {
    let source = ScriptedSource::new(vec![running()]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let policy = PollPolicy::new(Duration::from_secs(10), 6);

    let outcome = poll_job(&source, &handle(), &policy, &jobpoll::NoProgress, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(source.queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_interval_sleep() {
    let source = ScriptedSource::new(vec![running(), running()]);
    let cancel = CancellationToken::new();
    let policy = PollPolicy::new(Duration::from_secs(60), 6);

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        })
    };

    let start = tokio::time::Instant::now();
    let outcome = poll_job(&source, &handle(), &policy, &jobpoll::NoProgress, &cancel)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(source.queries(), 1);
    // Aborted mid-sleep, well before the 60s interval elapsed.
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}
