//! GitHub OAuth provider
//!
//! GitHub answers token requests with 200 even on failure, carrying an
//! `error` field instead; tokens without `expires_in` are given eight hours.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use kernel::error::app_error::AppResult;
use serde::Deserialize;
use url::Url;

use super::oauth_http::{self, ProviderEndpoints};
use crate::application::config::ProviderCredentials;
use crate::domain::provider::OAuthProvider;
use crate::domain::value_object::{oauth_token::OAuthToken, user_info::UserInfo};

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USERINFO_URL: &str = "https://api.github.com/user";

const SCOPES: &str = "user:email";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

pub struct GitHubProvider {
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl GitHubProvider {
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

    /// `<userinfo>/emails`
    fn emails_url(&self) -> Url {
        let mut url = self.endpoints.userinfo_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("emails");
        }
        url
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> AppResult<OAuthToken> {
        oauth_http::post_token_form(&self.http, &self.endpoints.token_url, params, operation)
            .await?
            .into_token(Utc::now(), Some(Duration::hours(DEFAULT_TOKEN_TTL_HOURS)))
    }

    /// Primary address from `/user/emails`, falling back to the first
    /// verified one. Failures leave the email empty.
    async fn primary_email(&self, access_token: &str) -> String {
        let emails: Vec<GitHubEmail> = match oauth_http::get_json(
            &self.http,
            &self.emails_url(),
            access_token,
            "get user emails",
        )
        .await
        {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch GitHub emails");
                return String::new();
            }
        };

        emails
            .iter()
            .find(|e| e.primary)
            .or_else(|| emails.iter().find(|e| e.verified))
            .map(|e| e.email.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn auth_url(&self, state: &str) -> String {
        oauth_http::build_auth_url(
            &self.endpoints.auth_url,
            &self.credentials.client_id,
            &self.credentials.redirect_uri,
            SCOPES,
            state,
            &[],
        )
    }

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthToken> {
        let params = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];
        self.request_token(&params, "exchange code").await
    }

    async fn get_user_info(&self, mut token: OAuthToken) -> AppResult<UserInfo> {
        token.refresh_if_needed(self).await?;

        let user: GitHubUser = oauth_http::get_json(
            &self.http,
            &self.endpoints.userinfo_url,
            &token.access_token,
            "get user info",
        )
        .await?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => email,
            None => self.primary_email(&token.access_token).await,
        };
        let name = user.name.filter(|n| !n.is_empty()).unwrap_or(user.login);

        Ok(UserInfo {
            external_id: user.id.to_string(),
            email,
            name,
            provider_name: self.name().to_string(),
            profile_picture: user.avatar_url.filter(|p| !p.is_empty()),
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
        self.request_token(&params, "refresh token").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn provider(server: &MockServer) -> GitHubProvider {
        GitHubProvider::new(ProviderCredentials::new(
            "gh-client",
            "gh-secret",
            "http://localhost:31113/login/github/callback",
        ))
        .with_endpoints(ProviderEndpoints {
            auth_url: AUTH_URL.parse().unwrap(),
            token_url: server.url("/login/oauth/access_token").parse().unwrap(),
            userinfo_url: server.url("/user").parse().unwrap(),
        })
    }

    #[test]
    fn test_auth_url() {
        let github = GitHubProvider::new(ProviderCredentials::new(
            "gh-client",
            "secret",
            "http://localhost/cb",
        ));

        let url = github.auth_url("st8");

        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("scope=user%3Aemail"));
        assert!(url.contains("state=st8"));
    }

    #[test]
    fn test_emails_url() {
        let github = GitHubProvider::new(ProviderCredentials::new("a", "b", "http://c/"));
        assert_eq!(github.emails_url().as_str(), "https://api.github.com/user/emails");
    }

    #[tokio::test]
    async fn test_exchange_code_defaults_to_eight_hours() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login/oauth/access_token")
                    .header("accept", "application/json")
                    .body_contains("code=abc");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "gho_token",
                    "token_type": "bearer",
                    "scope": "user:email",
                }));
            })
            .await;

        let before = Utc::now();
        let token = provider(&server).exchange_code("abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "gho_token");
        let expires_at = token.expires_at.unwrap();
        assert!(expires_at >= before + Duration::hours(8));
        assert!(expires_at <= Utc::now() + Duration::hours(8));
    }

    #[tokio::test]
    async fn test_error_body_with_200_is_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login/oauth/access_token");
                then.status(200).json_body(serde_json::json!({
                    "error": "bad_verification_code",
                    "error_description": "The code passed is incorrect or expired.",
                }));
            })
            .await;

        let err = provider(&server).exchange_code("stale").await.unwrap_err();

        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_get_user_info_with_public_email() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user")
                    .header("authorization", "Bearer gho_token")
                    .header_exists("user-agent");
                then.status(200).json_body(serde_json::json!({
                    "id": 583231,
                    "login": "octocat",
                    "name": "The Octocat",
                    "email": "octocat@github.com",
                    "avatar_url": "https://avatars.githubusercontent.com/u/583231",
                }));
            })
            .await;

        let info = provider(&server)
            .get_user_info(OAuthToken::new("gho_token"))
            .await
            .unwrap();

        assert_eq!(info.external_id, "583231");
        assert_eq!(info.email, "octocat@github.com");
        assert_eq!(info.name, "The Octocat");
        assert_eq!(info.provider_name, "github");
        assert_eq!(
            info.profile_picture.as_deref(),
            Some("https://avatars.githubusercontent.com/u/583231")
        );
    }

    #[tokio::test]
    async fn test_get_user_info_private_email_and_no_name() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user");
                then.status(200).json_body(serde_json::json!({
                    "id": 1,
                    "login": "hubot",
                    "name": null,
                    "email": null,
                }));
            })
            .await;
        let emails = server
            .mock_async(|when, then| {
                when.method(GET).path("/user/emails");
                then.status(200).json_body(serde_json::json!([
                    { "email": "old@example.com", "primary": false, "verified": true },
                    { "email": "hubot@example.com", "primary": true, "verified": true },
                ]));
            })
            .await;

        let info = provider(&server)
            .get_user_info(OAuthToken::new("t"))
            .await
            .unwrap();

        emails.assert_async().await;
        assert_eq!(info.email, "hubot@example.com");
        assert_eq!(info.name, "hubot");
        assert_eq!(info.profile_picture, None);
    }

    #[tokio::test]
    async fn test_emails_failure_leaves_email_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user");
                then.status(200)
                    .json_body(serde_json::json!({ "id": 2, "login": "ghost" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user/emails");
                then.status(403);
            })
            .await;

        let info = provider(&server)
            .get_user_info(OAuthToken::new("t"))
            .await
            .unwrap();

        assert_eq!(info.email, "");
    }

    #[tokio::test]
    async fn test_get_user_info_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user");
                then.status(401)
                    .json_body(serde_json::json!({ "message": "Bad credentials" }));
            })
            .await;

        let err = provider(&server)
            .get_user_info(OAuthToken::new("revoked"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(err.message().contains("401"));
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login/oauth/access_token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=ghr_old");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "gho_new",
                    "expires_in": 28800,
                }));
            })
            .await;

        let token = provider(&server).refresh_token("ghr_old").await.unwrap();

        assert_eq!(token.access_token, "gho_new");
        assert_eq!(token.refresh_token, None);
    }
}
