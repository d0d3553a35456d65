//! Sliding Window Limiter
//!
//! Grants at most `limit` permits within any trailing `period`. Every grant is
//! recorded as a timestamp; stale timestamps are trimmed lazily on the next
//! acquire. Waiting callers line up on a fair queue and are served in arrival
//! order; only the head of the queue sleeps for a slot, and it never holds the
//! window lock while doing so.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Mutex as TurnQueue;
use tokio::time::{self, Instant};

use super::config::RateLimitError;

/// Sliding-window rate limiter
///
/// The limiter is `Sync` and meant to be shared behind an `Arc` by every task
/// that performs a throttled operation.
///
/// # Example
///
/// ```ignore
/// let limiter = SlidingWindowLimiter::new(95, Duration::from_secs(30))?;
/// limiter.acquire().await;
/// session.send(channel, "/ban someone").await?;
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    /// Maximum permits per window
    limit: u32,

    /// Window length
    period: Duration,

    /// Grant timestamps, oldest first
    window: Mutex<VecDeque<Instant>>,

    /// FIFO queue of `acquire` callers
    turn: TurnQueue<()>,
}

impl SlidingWindowLimiter {
    /// Create a new limiter
    ///
    /// # Errors
    ///
    /// Returns an error if `limit` is zero or `period` is zero.
    pub fn new(limit: u32, period: Duration) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::InvalidLimit(limit));
        }
        if period.is_zero() {
            return Err(RateLimitError::InvalidPeriod(period));
        }

        Ok(Self {
            limit,
            period,
            window: Mutex::new(VecDeque::with_capacity((limit as usize).min(1024))),
            turn: TurnQueue::new(()),
        })
    }

    /// Maximum permits per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until a permit is available, then take it
    ///
    /// Callers are granted in the order they called `acquire`.
    pub async fn acquire(&self) {
        let _turn = self.turn.lock().await;
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    tracing::trace!("Rate limit reached, waiting {:?} for a free slot", wait);
                    time::sleep(wait).await;
                }
            }
        }
    }

    /// Take a permit if one is free right now
    ///
    /// Returns the time until the oldest grant leaves the window otherwise.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Number of permits that could be granted right now
    pub fn available(&self) -> u32 {
        let now = Instant::now();
        let mut window = self.lock();
        self.trim(&mut window, now);
        self.limit.saturating_sub(window.len() as u32)
    }

    fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut window = self.lock();
        self.trim(&mut window, now);

        if window.len() < self.limit as usize {
            window.push_back(now);
            return Ok(());
        }

        match window.front() {
            Some(&oldest) => Err(self.period.saturating_sub(now.duration_since(oldest))),
            None => Err(Duration::ZERO),
        }
    }

    /// Drop grants at or beyond the trailing edge of the window
    fn trim(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The queue stays consistent even if a holder panicked mid-trim
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
