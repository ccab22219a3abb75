//! OAuth Token
//!
//! Access token, optional refresh token and optional expiry as returned by a
//! provider's token endpoint.

use chrono::{DateTime, Duration, Utc};
use kernel::error::app_error::AppResult;

use crate::domain::provider::OAuthProvider;

/// Seconds before expiry at which a token is already considered stale.
pub const REFRESH_BUFFER_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `None` means the token does not expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    /// True when the token expires within [`REFRESH_BUFFER_SECS`] of `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(REFRESH_BUFFER_SECS) >= expires_at)
    }

    /// Refresh through `provider` when the token is about to expire and a
    /// refresh token is available.
    ///
    /// Returns whether a refresh happened. On failure the token is left
    /// untouched. A provider that omits a new refresh token keeps the old one.
    pub async fn refresh_if_needed(&mut self, provider: &dyn OAuthProvider) -> AppResult<bool> {
        if !self.needs_refresh() {
            return Ok(false);
        }
        let Some(refresh_token) = self.refresh_token.as_deref() else {
            return Ok(false);
        };

        let refreshed = provider.refresh_token(refresh_token).await?;

        tracing::debug!(provider = provider.name(), "OAuth token refreshed");

        self.access_token = refreshed.access_token;
        self.expires_at = refreshed.expires_at;
        if refreshed.refresh_token.is_some() {
            self.refresh_token = refreshed.refresh_token;
        }

        Ok(true)
    }
}
