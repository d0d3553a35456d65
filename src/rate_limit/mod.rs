//! Rate Limiting Module
//!
//! This module throttles chat commands so that a bulk run never exceeds the
//! provider's action rate.
//!
//! # Features
//!
//! - Sliding window algorithm (no fixed buckets, no boundary bursts)
//! - Lock held only for bookkeeping, never across a wait
//! - Configurable limit and period, validated at construction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              SlidingWindowLimiter             │
//! ├──────────────────────────────────────────────┤
//! │  acquire() ─► trim ─► grant │ sleep ─► retry   │
//! │  ┌────────────────────────────────────────┐  │
//! │  │   Mutex<VecDeque<Instant>> (grants)     │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod sliding_window;

pub use config::{
    RateLimitConfig, RateLimitError, DEFAULT_COMMAND_LIMIT, DEFAULT_COMMAND_PERIOD_SECS,
};
pub use sliding_window::SlidingWindowLimiter;
