//! OAuth Provider Contract
//!
//! What the auth service needs from an identity provider. Provider failures
//! are reported as kernel API errors; the service re-tags them.

use async_trait::async_trait;
use kernel::error::app_error::AppResult;

use crate::domain::value_object::{oauth_token::OAuthToken, user_info::UserInfo};

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short lowercase name, e.g. "google"
    fn name(&self) -> &str;

    /// Authorization URL the browser is redirected to, carrying `state`
    fn auth_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token
    async fn exchange_code(&self, code: &str) -> AppResult<OAuthToken>;

    /// Fetch the normalized identity for `token`
    async fn get_user_info(&self, token: OAuthToken) -> AppResult<UserInfo>;

    /// Obtain a fresh token from a refresh token
    async fn refresh_token(&self, refresh_token: &str) -> AppResult<OAuthToken>;
}
