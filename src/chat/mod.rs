//! Chat Connection
//!
//! WebSocket implementation of [`crate::dispatch::ChatSession`] plus the
//! minimal line codec it needs.

pub mod client;
pub mod line;

pub use client::{ChatConfig, TwitchChatSession, DEFAULT_CHAT_URL, DEFAULT_PING_INTERVAL};
pub use line::ChatLine;
