//! Dispatcher runs against in-memory chat sessions, on paused time

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use twitch_tools::dispatch::{
    BatchDispatcher, BatchJob, ChatSession, CommandTemplate, DispatchError, ReadySignal,
    SessionError,
};
use twitch_tools::rate_limit::RateLimitConfig;

/// Records every command and when it was sent
#[derive(Default)]
struct CountingSession {
    sends: Mutex<HashMap<String, usize>>,
    sent_at: Mutex<Vec<Instant>>,
    send_calls: AtomicUsize,
    disconnects: AtomicUsize,
    /// Cancel this token when the n-th send (1-based) starts
    cancel_on: Option<(usize, CancellationToken)>,
    /// Simulated network latency per send
    latency: Duration,
    ready: ReadySignal,
    /// Delay before the server's welcome
    ready_after: Duration,
}

#[async_trait]
impl ChatSession for CountingSession {
    async fn connect(&self) -> Result<(), SessionError> {
        let ready = self.ready.clone();
        let delay = self.ready_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            ready.fire();
            // A second welcome must not matter
            tokio::time::sleep(Duration::from_secs(1)).await;
            ready.fire();
        });
        Ok(())
    }

    async fn wait_ready(&self) -> Result<(), SessionError> {
        self.ready.wait().await
    }

    async fn send(&self, _channel: &str, command: &str) -> Result<(), SessionError> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, token)) = &self.cancel_on {
            if call == *n {
                token.cancel();
            }
        }
        tokio::time::sleep(self.latency).await;

        *self
            .sends
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default() += 1;
        self.sent_at.lock().unwrap().push(Instant::now());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn job(count: usize, limit: u32, period_secs: u64) -> BatchJob {
    let targets: Vec<String> = (0..count).map(|i| format!("user_{}", i)).collect();
    BatchJob::new(
        targets,
        CommandTemplate::new("#somechannel", "ban", ""),
        RateLimitConfig::new(limit, period_secs),
    )
}

#[tokio::test(start_paused = true)]
async fn test_two_hundred_targets_respect_window() {
    let session = Arc::new(CountingSession::default());
    let job = job(200, 95, 30);
    let dispatcher = BatchDispatcher::for_job(&job).unwrap();

    let start = Instant::now();
    let report = dispatcher
        .run(Arc::clone(&session), &job, &CancellationToken::new())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // ceil(200 / 95 - 1) windows of 30s
    assert!(elapsed >= Duration::from_secs(60), "elapsed {:?}", elapsed);
    assert_eq!(report.succeeded(), 200);

    let sends = session.sends.lock().unwrap();
    assert_eq!(sends.len(), 200);
    assert!(sends.values().all(|&n| n == 1));
    assert!(sends.contains_key("/ban user_0"));
    assert!(sends.contains_key("/ban user_199"));

    // No trailing 30s window ever holds more than 95 sends
    let times = session.sent_at.lock().unwrap();
    for (i, t) in times.iter().enumerate() {
        let in_window = times[i..]
            .iter()
            .filter(|u| u.duration_since(*t) < Duration::from_secs(30))
            .count();
        assert!(in_window <= 95);
    }

    assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_third_send() {
    let cancel = CancellationToken::new();
    let session = Arc::new(CountingSession {
        cancel_on: Some((3, cancel.clone())),
        latency: Duration::from_secs(1),
        ..Default::default()
    });
    let job = job(6, 3, 30);
    let dispatcher = BatchDispatcher::for_job(&job).unwrap();

    let start = Instant::now();
    let err = dispatcher
        .run(Arc::clone(&session), &job, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let report = match &err {
        DispatchError::Cancelled(report) => report,
        other => panic!("expected cancellation, got {:?}", other),
    };

    // The three admitted sends finished; nothing else was admitted
    assert_eq!(report.admitted(), 3);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.skipped, vec!["user_3", "user_4", "user_5"]);
    assert_eq!(session.send_calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.sends.lock().unwrap().len(), 3);
    assert_eq!(dispatcher.limiter().available(), 0);

    // The blocked fourth acquire was abandoned, not waited out
    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_waits_for_readiness() {
    let session = Arc::new(CountingSession {
        ready_after: Duration::from_secs(5),
        ..Default::default()
    });
    let job = job(4, 10, 30);
    let dispatcher = BatchDispatcher::for_job(&job)
        .unwrap()
        .with_ready_timeout(Duration::from_secs(10));

    let start = Instant::now();
    let report = dispatcher
        .run(Arc::clone(&session), &job, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 4);
    for sent in session.sent_at.lock().unwrap().iter() {
        assert!(sent.duration_since(start) >= Duration::from_secs(5));
    }
    assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_readiness_times_out() {
    let session = Arc::new(CountingSession {
        ready_after: Duration::from_secs(60),
        ..Default::default()
    });
    let job = job(2, 10, 30);
    let dispatcher = BatchDispatcher::for_job(&job)
        .unwrap()
        .with_ready_timeout(Duration::from_secs(30));

    let err = dispatcher
        .run(Arc::clone(&session), &job, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Session(SessionError::ReadyTimeout(_))
    ));
    assert_eq!(session.send_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_hold_drains_and_disconnects() {
    let cancel = CancellationToken::new();
    let session = Arc::new(CountingSession::default());
    let job = job(3, 10, 30);

    let hold_cancel = cancel.clone();
    let hold = async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        hold_cancel.cancel();
        std::future::pending::<()>().await;
    };

    let report = BatchDispatcher::for_job(&job)
        .unwrap()
        .run_with_hold(Arc::clone(&session), &job, &cancel, hold)
        .await
        .unwrap();

    // Everything was already admitted, so the run itself is not cancelled
    assert_eq!(report.succeeded(), 3);
    assert!(!report.cancelled);
    assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
}
