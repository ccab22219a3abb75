//! HTTP plumbing shared by the OAuth providers.

use chrono::{DateTime, Duration, Utc};
use kernel::error::app_error::{AppError, AppResult};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::domain::value_object::oauth_token::OAuthToken;

pub(crate) const CLIENT_USER_AGENT: &str = concat!("lucia/", env!("CARGO_PKG_VERSION"));

/// Endpoint set of one provider
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Convert into a token. `default_ttl` applies when the provider sends no
    /// `expires_in`; `None` then means the token never expires.
    pub fn into_token(
        self,
        now: DateTime<Utc>,
        default_ttl: Option<Duration>,
    ) -> AppResult<OAuthToken> {
        if let Some(error) = self.error {
            let detail = self.error_description.unwrap_or_default();
            return Err(AppError::unauthorized(format!(
                "Token endpoint returned error: {error} {detail}"
            )));
        }

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unexpected("Token response has no access token"))?;

        let expires_at: Option<DateTime<Utc>> = match self.expires_in {
            Some(secs) if secs > 0 => Some(now + Duration::seconds(secs)),
            _ => default_ttl.map(|ttl| now + ttl),
        };

        Ok(OAuthToken {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        })
    }
}

/// Checks HTTP response status; non-2xx becomes `Unauthorized`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(operation, status, body = %body, "Provider rejected request");
    Err(AppError::unauthorized(format!(
        "Failed to {operation}: status code {status}"
    )))
}

fn transport_error(operation: &'static str, err: reqwest::Error) -> AppError {
    AppError::unexpected(format!("Failed to {operation}")).with_source(err)
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &'static str,
) -> AppResult<T> {
    response.json::<T>().await.map_err(|e| {
        AppError::unexpected(format!("Failed to decode response to {operation}")).with_source(e)
    })
}

/// POST a form to a token endpoint and decode the JSON answer
pub(crate) async fn post_token_form(
    http: &reqwest::Client,
    url: &Url,
    params: &[(&str, &str)],
    operation: &'static str,
) -> AppResult<TokenResponse> {
    let response = http
        .post(url.clone())
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .form(params)
        .send()
        .await
        .map_err(|e| transport_error(operation, e))?;

    let response = ensure_success(response, operation).await?;
    decode(response, operation).await
}

/// GET a JSON resource with a bearer token
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &Url,
    access_token: &str,
    operation: &'static str,
) -> AppResult<T> {
    let response = http
        .get(url.clone())
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .send()
        .await
        .map_err(|e| transport_error(operation, e))?;

    let response = ensure_success(response, operation).await?;
    decode(response, operation).await
}

/// Authorization URL with the standard code-grant parameters plus `extra`
pub(crate) fn build_auth_url(
    endpoint: &Url,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
    extra: &[(&str, &str)],
) -> String {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", scope)
            .append_pair("state", state);
        for (key, value) in extra {
            query.append_pair(key, value);
        }
    }
    url.into()
}
