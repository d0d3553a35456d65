//! Helix REST Client
//!
//! Thin `reqwest` wrapper for the handful of Helix endpoints the tool calls.
//! Requests are never retried here; callers decide what to do with a failure.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{
    FollowEntry, FollowOrigin, FollowQuery, FollowedChannel, Follower, HelixErrorBody,
    HelixResponse, User, UserQuery,
};
use crate::pagination::{Page, PageRequest};

/// Default Helix endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Maximum number of logins or ids per `GET /users` request
pub const USERS_BATCH_LIMIT: usize = 100;

/// Errors raised by the Helix client
#[derive(Debug, thiserror::Error)]
pub enum HelixError {
    /// Client id or token not configured
    #[error("Missing Helix credential: {0}")]
    MissingCredential(&'static str),

    /// Credential contains characters not allowed in a header
    #[error("Invalid Helix credential: {0}")]
    InvalidCredential(&'static str),

    /// Transport-level failure
    #[error("HTTP request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Helix answered with a non-success status
    #[error("Helix returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode Helix response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Login lookup returned nothing
    #[error("Could not find user: {0}")]
    UserNotFound(String),
}

/// Helix client configuration
#[derive(Debug, Clone)]
pub struct HelixConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: None,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Helix API client
#[derive(Debug, Clone)]
pub struct HelixClient {
    http: reqwest::Client,
    base_url: String,
}

impl HelixClient {
    /// Build a client that sends the configured credentials on every request
    ///
    /// # Errors
    ///
    /// Returns an error if the client id or token is missing or not a valid
    /// header value.
    pub fn new(config: &HelixConfig) -> Result<Self, HelixError> {
        let client_id = config
            .client_id
            .as_deref()
            .ok_or(HelixError::MissingCredential("client id"))?;
        let token = config
            .token
            .as_deref()
            .ok_or(HelixError::MissingCredential("token"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Client-Id",
            HeaderValue::from_str(client_id)
                .map_err(|_| HelixError::InvalidCredential("client id"))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", strip_oauth_prefix(token)))
            .map_err(|_| HelixError::InvalidCredential("token"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| HelixError::Http {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up users by login or id, in batches of [`USERS_BATCH_LIMIT`]
    ///
    /// Unknown users are simply absent from the result.
    pub async fn get_users(&self, query: &UserQuery) -> Result<Vec<User>, HelixError> {
        let (key, values) = match query {
            UserQuery::Logins(logins) => ("login", logins),
            UserQuery::Ids(ids) => ("id", ids),
        };

        let mut users = Vec::with_capacity(values.len());
        for batch in values.chunks(USERS_BATCH_LIMIT) {
            let params: Vec<(&str, &str)> = batch.iter().map(|v| (key, v.as_str())).collect();
            let response: HelixResponse<User> = self.get("users", &params).await?;
            tracing::debug!(
                "Fetched {} of {} requested users",
                response.data.len(),
                batch.len()
            );
            users.extend(response.data);
        }
        Ok(users)
    }

    /// Resolve a login to a user id
    pub async fn resolve_user_id(&self, login: &str) -> Result<String, HelixError> {
        let users = self
            .get_users(&UserQuery::Logins(vec![login.to_string()]))
            .await?;
        users
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| HelixError::UserNotFound(login.to_string()))
    }

    /// Fetch one page of a follow listing
    pub async fn get_follows(
        &self,
        query: &FollowQuery,
        request: PageRequest,
    ) -> Result<Page<FollowEntry>, HelixError> {
        let first = request.size.to_string();
        let mut params: Vec<(&str, &str)> = vec![("first", first.as_str())];
        if let Some(cursor) = request.cursor.as_deref() {
            params.push(("after", cursor));
        }

        match query.origin {
            FollowOrigin::From => {
                params.push(("user_id", query.user_id.as_str()));
                let response: HelixResponse<FollowedChannel> =
                    self.get("channels/followed", &params).await?;
                Ok(convert_page(response))
            }
            FollowOrigin::To => {
                params.push(("broadcaster_id", query.user_id.as_str()));
                let response: HelixResponse<Follower> =
                    self.get("channels/followers", &params).await?;
                Ok(convert_page(response))
            }
        }
    }

    async fn get<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, HelixError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| HelixError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HelixError::Status {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| HelixError::Decode { url, source })
    }
}

fn convert_page<S, T>(response: HelixResponse<S>) -> Page<T>
where
    T: From<S>,
{
    let page = response.into_page();
    let cursor = page.cursor().map(str::to_string);
    Page::new(page.into_items().into_iter().map(T::from).collect(), cursor)
}

fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<HelixErrorBody>(body) {
        Ok(HelixErrorBody {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        Ok(HelixErrorBody {
            error: Some(error), ..
        }) => error,
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

/// Accept tokens copied in chat form (`oauth:...`)
pub(crate) fn strip_oauth_prefix(token: &str) -> &str {
    token.strip_prefix("oauth:").unwrap_or(token)
}
