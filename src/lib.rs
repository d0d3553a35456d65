//! Twitch Tools Library
//!
//! Follow listings over cursor pagination, user lookups, and rate-limited
//! bulk chat commands. The `twitch-tools` binary wires these together.

pub mod chat;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod helix;
pub mod output;
pub mod pagination;
pub mod rate_limit;
