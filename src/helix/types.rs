//! Helix API Types
//!
//! Response payloads for the endpoints the tool uses. Only the fields that are
//! printed or needed for pagination are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::Page;

/// Standard Helix response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct HelixResponse<T> {
    pub data: Vec<T>,

    #[serde(default)]
    pub pagination: Option<HelixPagination>,

    /// Total number of records, when the endpoint reports it
    #[serde(default)]
    pub total: Option<u64>,
}

/// Pagination block of a Helix response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelixPagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

impl<T> HelixResponse<T> {
    /// Convert into a page, keeping the continuation cursor
    pub fn into_page(self) -> Page<T> {
        let cursor = self.pagination.and_then(|p| p.cursor);
        Page::new(self.data, cursor)
    }
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HelixErrorBody {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// A user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,

    /// Staff type (`admin`, `global_mod`, `staff` or empty)
    #[serde(rename = "type", default)]
    pub user_type: String,

    /// `affiliate`, `partner` or empty
    #[serde(default)]
    pub broadcaster_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub profile_image_url: String,

    pub created_at: DateTime<Utc>,
}

/// Entry of `GET /channels/followers`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Follower {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub followed_at: DateTime<Utc>,
}

/// Entry of `GET /channels/followed`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FollowedChannel {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    pub followed_at: DateTime<Utc>,
}

/// The other side of a follow relationship, whichever direction was listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowEntry {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub followed_at: DateTime<Utc>,
}

impl From<Follower> for FollowEntry {
    fn from(f: Follower) -> Self {
        Self {
            id: f.user_id,
            login: f.user_login,
            display_name: f.user_name,
            followed_at: f.followed_at,
        }
    }
}

impl From<FollowedChannel> for FollowEntry {
    fn from(f: FollowedChannel) -> Self {
        Self {
            id: f.broadcaster_id,
            login: f.broadcaster_login,
            display_name: f.broadcaster_name,
            followed_at: f.followed_at,
        }
    }
}

/// Direction of a follow listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOrigin {
    /// Channels the user follows
    From,

    /// Users following the channel
    To,
}

/// Which follow listing to walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowQuery {
    pub origin: FollowOrigin,
    pub user_id: String,
}

/// How users are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserQuery {
    Logins(Vec<String>),
    Ids(Vec<String>),
}

impl UserQuery {
    pub fn len(&self) -> usize {
        match self {
            UserQuery::Logins(v) | UserQuery::Ids(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
