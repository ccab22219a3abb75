//! Google OAuth provider

use async_trait::async_trait;
use chrono::Utc;
use kernel::error::app_error::AppResult;
use serde::Deserialize;
use url::Url;

use super::oauth_http::{self, ProviderEndpoints};
use crate::application::config::ProviderCredentials;
use crate::domain::provider::OAuthProvider;
use crate::domain::value_object::{oauth_token::OAuthToken, user_info::UserInfo};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPES: &str = "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: Option<String>,
}

pub struct GoogleProvider {
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self {
            credentials,
            endpoints: ProviderEndpoints {
                auth_url: AUTH_URL.parse().expect("valid default URL"),
                token_url: TOKEN_URL.parse().expect("valid default URL"),
                userinfo_url: USERINFO_URL.parse().expect("valid default URL"),
            },
            http: reqwest::Client::new(),
        }
    }

    /// Point the provider at other endpoints (mock servers in tests).
    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn token_url(&self) -> &Url {
        &self.endpoints.token_url
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn auth_url(&self, state: &str) -> String {
        oauth_http::build_auth_url(
            &self.endpoints.auth_url,
            &self.credentials.client_id,
            &self.credentials.redirect_uri,
            SCOPES,
            state,
            &[("access_type", "offline")],
        )
    }

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        oauth_http::post_token_form(&self.http, self.token_url(), &params, "exchange code")
            .await?
            .into_token(Utc::now(), None)
    }

    async fn get_user_info(&self, mut token: OAuthToken) -> AppResult<UserInfo> {
        token.refresh_if_needed(self).await?;

        let user: GoogleUser = oauth_http::get_json(
            &self.http,
            &self.endpoints.userinfo_url,
            &token.access_token,
            "get user info",
        )
        .await?;

        Ok(UserInfo {
            external_id: user.id,
            email: user.email,
            name: user.name,
            provider_name: self.name().to_string(),
            profile_picture: user.picture.filter(|p| !p.is_empty()),
            token,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> AppResult<OAuthToken> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        oauth_http::post_token_form(&self.http, self.token_url(), &params, "refresh token")
            .await?
            .into_token(Utc::now(), None)
    }
}
