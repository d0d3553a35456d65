//! Single-fire readiness latch.
//!
//! Resolved at most once, either ready or failed. Later announcements are
//! ignored, so a server re-sending its welcome cannot restart a dispatch.

use std::sync::Arc;
use tokio::sync::watch;

use super::session::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadyState {
    Pending,
    Ready,
    Failed(SessionError),
}

/// Readiness latch shared between a session reader and its waiters
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<ReadyState>>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadyState::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Mark the session ready; returns `false` if already resolved
    pub fn fire(&self) -> bool {
        self.resolve(ReadyState::Ready)
    }

    /// Mark the session failed; returns `false` if already resolved
    pub fn fail(&self, error: SessionError) -> bool {
        self.resolve(ReadyState::Failed(error))
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow() == ReadyState::Ready
    }

    pub fn is_resolved(&self) -> bool {
        *self.tx.borrow() != ReadyState::Pending
    }

    /// Wait until the latch resolves
    pub async fn wait(&self) -> Result<(), SessionError> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|state| *state != ReadyState::Pending)
            .await
            .map(|state| state.clone())
            .map_err(|_| SessionError::Closed("readiness signal dropped".to_string()))?;

        match state {
            ReadyState::Ready => Ok(()),
            ReadyState::Failed(error) => Err(error),
            ReadyState::Pending => Err(SessionError::NotConnected),
        }
    }

    fn resolve(&self, next: ReadyState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ReadyState::Pending {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fires_once() {
        let signal = ReadySignal::new();
        assert!(!signal.is_resolved());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(!signal.fail(SessionError::Login("late".into())));
        assert!(signal.is_ready());
        assert!(signal.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_reaches_waiter() {
        let signal = ReadySignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::task::yield_now().await;
        signal.fail(SessionError::Login("Login authentication failed".into()));

        let result = waiter.await.unwrap();
        assert_eq!(
            result,
            Err(SessionError::Login("Login authentication failed".into()))
        );
        assert!(!signal.fire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_blocks_until_fired() {
        let signal = ReadySignal::new();
        let pending = tokio::time::timeout(Duration::from_secs(1), signal.wait()).await;
        assert!(pending.is_err());

        signal.fire();
        assert!(signal.wait().await.is_ok());
    }
}
