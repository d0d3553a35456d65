//! Batch Dispatcher
//!
//! Runs one chat command per target over a single session:
//!
//! ```text
//! Disconnected ─► Connecting ─► AwaitingReady ─► Dispatching ─► Draining ─► Disconnected
//!                     │               │                │             │
//!                     └───────────────┴── error / cancel ┴─────────────┴──► teardown
//! ```
//!
//! Each target waits for a limiter permit in submission order and is then sent
//! from its own task. The limiter is the only admission control. Failed sends
//! are collected per target; they never abort sends that were already
//! admitted.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::job::BatchJob;
use super::session::{ChatSession, SessionError};
use crate::rate_limit::{RateLimitError, SlidingWindowLimiter};

/// Default time allowed for the server to announce readiness
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatcher lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Disconnected,
    Connecting,
    AwaitingReady,
    Dispatching,
    Draining,
}

/// Result of the command sent to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: String,
    pub result: Result<(), SessionError>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-target summary of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of targets in the job
    pub total: usize,

    /// Outcomes of admitted sends, in completion order
    pub outcomes: Vec<TargetOutcome>,

    /// Targets never admitted because the run was cancelled
    pub skipped: Vec<String>,

    /// Whether cancellation stopped admission early
    pub cancelled: bool,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Number of sends that were admitted
    pub fn admitted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// First failure in completion order
    pub fn first_failure(&self) -> Option<&TargetOutcome> {
        self.failed().next()
    }

    /// Turn the report into an error if the run was cancelled or any send failed
    pub fn into_result(self) -> Result<BatchReport, DispatchError> {
        if self.cancelled {
            Err(DispatchError::Cancelled(self))
        } else if self.failed().next().is_some() {
            Err(DispatchError::PartialFailure(self))
        } else {
            Ok(self)
        }
    }
}

/// Errors raised by a dispatch run
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Connecting or waiting for readiness failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The run was cancelled; the report lists what was and wasn't sent
    #[error("Dispatch cancelled after {} of {} commands", .0.admitted(), .0.total)]
    Cancelled(BatchReport),

    /// Some sends failed while others succeeded
    #[error("{} of {} commands failed", .0.failed().count(), .0.total)]
    PartialFailure(BatchReport),
}

impl DispatchError {
    /// Per-target report, when dispatching got far enough to produce one
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            DispatchError::Session(_) => None,
            DispatchError::Cancelled(report) | DispatchError::PartialFailure(report) => {
                Some(report)
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            DispatchError::Cancelled(_) => true,
            DispatchError::Session(e) => e.is_cancelled(),
            DispatchError::PartialFailure(_) => false,
        }
    }
}

/// Rate-limited fan-out of chat commands over one session
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    /// Admission control shared by every send
    limiter: Arc<SlidingWindowLimiter>,

    /// Time allowed for the readiness announcement
    ready_timeout: Duration,
}

impl BatchDispatcher {
    /// Create a dispatcher around an existing limiter
    pub fn new(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            limiter,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Create a dispatcher with a limiter built from the job's limits
    pub fn for_job(job: &BatchJob) -> Result<Self, RateLimitError> {
        Ok(Self::new(Arc::new(job.limits().build()?)))
    }

    /// Set the readiness timeout
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Run the job and tear the session down afterwards
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Session`] if connecting or readiness failed
    /// - [`DispatchError::Cancelled`] if cancellation stopped the run
    /// - [`DispatchError::PartialFailure`] if any admitted send failed
    pub async fn run<S>(
        &self,
        session: Arc<S>,
        job: &BatchJob,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, DispatchError>
    where
        S: ChatSession + 'static,
    {
        self.run_with_hold(session, job, cancel, std::future::ready(()))
            .await
    }

    /// Same as [`run`](Self::run), but awaits `hold` after every send has been
    /// submitted and before draining
    pub async fn run_with_hold<S, H>(
        &self,
        session: Arc<S>,
        job: &BatchJob,
        cancel: &CancellationToken,
        hold: H,
    ) -> Result<BatchReport, DispatchError>
    where
        S: ChatSession + 'static,
        H: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %run_id,
            channel = job.template().channel(),
            targets = job.len()
        );

        async {
            let result = self.dispatch(&session, job, cancel, hold).await;

            enter(DispatchPhase::Disconnected);
            if let Err(e) = session.disconnect().await {
                tracing::warn!("Failed to disconnect chat session cleanly: {}", e);
            }

            result.and_then(BatchReport::into_result)
        }
        .instrument(span)
        .await
    }

    async fn dispatch<S, H>(
        &self,
        session: &Arc<S>,
        job: &BatchJob,
        cancel: &CancellationToken,
        hold: H,
    ) -> Result<BatchReport, DispatchError>
    where
        S: ChatSession + 'static,
        H: Future<Output = ()>,
    {
        let mut report = BatchReport::new(job.len());

        enter(DispatchPhase::Connecting);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled_before_dispatch(report, job)),
            result = session.connect() => result?,
        }

        enter(DispatchPhase::AwaitingReady);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled_before_dispatch(report, job)),
            result = time::timeout(self.ready_timeout, session.wait_ready()) => match result {
                Ok(ready) => ready?,
                Err(_) => return Err(SessionError::ReadyTimeout(self.ready_timeout).into()),
            },
        }

        enter(DispatchPhase::Dispatching);
        let mut tasks = JoinSet::new();
        let mut pending: HashSet<String> = HashSet::with_capacity(job.len());

        for (index, target) in job.targets().iter().enumerate() {
            let admitted = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = self.limiter.acquire() => true,
            };
            if !admitted {
                tracing::info!(
                    "Cancelled: {} of {} commands were not sent",
                    job.len() - index,
                    job.len()
                );
                report.cancelled = true;
                report.skipped = job.targets()[index..].to_vec();
                break;
            }

            let session = Arc::clone(session);
            let channel = job.template().channel().to_string();
            let command = job.template().render(target);
            let target = target.clone();
            pending.insert(target.clone());

            tracing::debug!("Submitting #{}: {}", index + 1, command);
            tasks.spawn(async move {
                let result = session.send(&channel, &command).await;
                TargetOutcome { target, result }
            });
        }

        if !report.cancelled {
            tokio::select! {
                _ = cancel.cancelled() => {},
                _ = hold => {},
            }
        }

        enter(DispatchPhase::Draining);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    pending.remove(&outcome.target);
                    match &outcome.result {
                        Ok(()) => tracing::debug!("Sent command for {}", outcome.target),
                        Err(e) => tracing::warn!("Command for {} failed: {}", outcome.target, e),
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => tracing::error!("Send task did not complete: {}", e),
            }
        }

        // Tasks that panicked never reported back
        for target in pending {
            report.outcomes.push(TargetOutcome {
                target,
                result: Err(SessionError::Send("send task aborted".to_string())),
            });
        }

        tracing::info!(
            "Dispatch finished: {} sent, {} failed, {} skipped",
            report.succeeded(),
            report.admitted() - report.succeeded(),
            report.skipped.len()
        );
        Ok(report)
    }
}

fn enter(phase: DispatchPhase) {
    tracing::debug!(?phase, "Dispatcher phase");
}

fn cancelled_before_dispatch(mut report: BatchReport, job: &BatchJob) -> BatchReport {
    tracing::info!("Cancelled before dispatching any command");
    report.cancelled = true;
    report.skipped = job.targets().to_vec();
    report
}
