//! Rate Limit Configuration
//!
//! Configuration for the sliding-window command limiter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::sliding_window::SlidingWindowLimiter;

/// Default rate limits
pub const DEFAULT_COMMAND_LIMIT: u32 = 95; // commands per period
pub const DEFAULT_COMMAND_PERIOD_SECS: u64 = 30;

/// Errors raised while building a limiter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Limit must allow at least one permit per period
    #[error("Invalid rate limit: {0} (must be at least 1)")]
    InvalidLimit(u32),

    /// Period must be a positive duration
    #[error("Invalid rate limit period: {0:?} (must be greater than zero)")]
    InvalidPeriod(Duration),
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of permits granted within one period
    pub limit: u32,

    /// Length of the trailing window in seconds
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_COMMAND_LIMIT,
            period_secs: DEFAULT_COMMAND_PERIOD_SECS,
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit configuration
    pub fn new(limit: u32, period_secs: u64) -> Self {
        Self { limit, period_secs }
    }

    /// Get the window length
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Check the limit and period without building a limiter
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.limit == 0 {
            return Err(RateLimitError::InvalidLimit(self.limit));
        }
        if self.period_secs == 0 {
            return Err(RateLimitError::InvalidPeriod(self.period()));
        }
        Ok(())
    }

    /// Build a limiter from this configuration
    pub fn build(&self) -> Result<SlidingWindowLimiter, RateLimitError> {
        SlidingWindowLimiter::new(self.limit, self.period())
    }
}
