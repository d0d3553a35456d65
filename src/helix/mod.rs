//! Helix REST API
//!
//! User lookup and follow listings. Follow listings are exposed one page at a
//! time so the pagination engine can drive them.

pub mod client;
pub mod types;

pub use client::{HelixClient, HelixConfig, HelixError, DEFAULT_BASE_URL, USERS_BATCH_LIMIT};
pub use types::{
    FollowEntry, FollowOrigin, FollowQuery, FollowedChannel, Follower, HelixPagination,
    HelixResponse, User, UserQuery,
};
