//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use kernel::error::app_error::{AppError, AppResult};

use crate::domain::provider::OAuthProvider;
use crate::domain::value_object::{oauth_token::OAuthToken, user_info::UserInfo};

/// Provider whose behaviour is fixed per test
#[derive(Clone)]
pub(crate) struct FakeProvider {
    pub external_id: &'static str,
    pub fail_exchange: bool,
    pub fail_user_info: bool,
}

impl FakeProvider {
    pub fn new(external_id: &'static str) -> Self {
        Self {
            external_id,
            fail_exchange: false,
            fail_user_info: false,
        }
    }
}

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://fake.test/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthToken> {
        if self.fail_exchange {
            return Err(AppError::unauthorized("status code 400"));
        }
        Ok(OAuthToken::new(format!("access-{code}")))
    }

    async fn get_user_info(&self, token: OAuthToken) -> AppResult<UserInfo> {
        if self.fail_user_info {
            return Err(AppError::unexpected("connection reset"));
        }
        Ok(UserInfo {
            external_id: self.external_id.to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            provider_name: "fake".to_string(),
            profile_picture: None,
            token,
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> AppResult<OAuthToken> {
        Ok(OAuthToken::new("refreshed"))
    }
}
