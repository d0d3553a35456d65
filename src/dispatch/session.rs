//! Chat Session Seam
//!
//! The dispatcher drives any session that implements [`ChatSession`]. The
//! concrete WebSocket client lives in `crate::chat`; tests use mocks.

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by a chat session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Connection could not be established
    #[error("Failed to connect to chat server: {0}")]
    Connect(String),

    /// Server rejected the credentials
    #[error("Chat login failed: {0}")]
    Login(String),

    /// Readiness was not announced in time
    #[error("Chat session not ready after {0:?}")]
    ReadyTimeout(Duration),

    /// Server closed the connection
    #[error("Chat connection closed: {0}")]
    Closed(String),

    /// Writing a command failed
    #[error("Failed to send chat command: {0}")]
    Send(String),

    /// Operation attempted before `connect` or after `disconnect`
    #[error("Chat session is not connected")]
    NotConnected,

    /// Caller gave up waiting
    #[error("Chat operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether this error reflects cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}

/// A persistent chat connection
///
/// Implementations must allow `send` to be called concurrently from several
/// tasks, and `disconnect` to be called more than once, including after a
/// failed `connect`.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Open the connection and start the login handshake
    async fn connect(&self) -> Result<(), SessionError>;

    /// Wait for the server to announce that the session is ready
    async fn wait_ready(&self) -> Result<(), SessionError>;

    /// Send one command to a channel
    async fn send(&self, channel: &str, command: &str) -> Result<(), SessionError>;

    /// Close the connection
    async fn disconnect(&self) -> Result<(), SessionError>;
}
