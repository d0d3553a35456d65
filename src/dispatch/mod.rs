//! Bulk Command Dispatch
//!
//! Issues one chat command per target over a single long-lived session,
//! throttled by a sliding-window limiter.
//!
//! # Architecture
//!
//! 1. **Job** (`job`): normalized targets and the command template
//! 2. **Session** (`session`, `ready`): the chat connection seam and its
//!    single-fire readiness latch
//! 3. **Dispatcher** (`dispatcher`): connect, await readiness, fan out,
//!    drain, tear down

pub mod dispatcher;
pub mod job;
pub mod ready;
pub mod session;

pub use dispatcher::{
    BatchDispatcher, BatchReport, DispatchError, DispatchPhase, TargetOutcome,
    DEFAULT_READY_TIMEOUT,
};
pub use job::{normalize_targets, split_targets, BatchJob, CommandTemplate};
pub use ready::ReadySignal;
pub use session::{ChatSession, SessionError};
