//! Auth Service
//!
//! Orchestrates the OAuth login: authorization URL, code exchange, user
//! resolution and session lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use kernel::id::{SessionId, UserId};
use platform::crypto::random_token;

use crate::domain::entity::{session::Session, user::AuthUser};
use crate::domain::provider::OAuthProvider;
use crate::domain::repository::{SessionStore, UserStore};
use crate::error::{AuthError, AuthErrorKind, AuthResult};

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Auth service
pub struct AuthService<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
    user_store: Arc<U>,
    session_store: Arc<S>,
    session_ttl: Duration,
}

impl<U, S> AuthService<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    pub fn new(user_store: Arc<U>, session_store: Arc<S>) -> Self {
        Self {
            providers: HashMap::new(),
            user_store,
            session_store,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Register a provider under `name`
    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn OAuthProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub fn provider(&self, name: &str) -> AuthResult<&Arc<dyn OAuthProvider>> {
        self.providers
            .get(name)
            .ok_or_else(|| AuthError::unknown_provider(name))
    }

    /// Registered provider names, sorted
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn user_store(&self) -> &Arc<U> {
        &self.user_store
    }

    pub fn session_store(&self) -> &Arc<S> {
        &self.session_store
    }

    /// Authorization URL and the fresh state it carries.
    ///
    /// Checking the state on callback is the caller's job.
    pub fn get_auth_url(&self, provider_name: &str) -> AuthResult<(String, String)> {
        let provider = self.provider(provider_name)?;
        let state = random_token();
        Ok((provider.auth_url(&state), state))
    }

    /// Complete a login: exchange the code, resolve or create the user and
    /// open a session for them.
    pub async fn handle_callback(&self, provider_name: &str, code: &str) -> AuthResult<Session> {
        let provider = self.provider(provider_name)?;

        let token = provider.exchange_code(code).await.map_err(|e| {
            AuthError::wrap(
                AuthErrorKind::TokenExchangeError,
                "Failed to exchange code for token",
                e,
            )
        })?;

        let mut info = provider.get_user_info(token).await.map_err(|e| {
            AuthError::wrap(AuthErrorKind::UserInfoError, "Failed to get user info", e)
        })?;
        // Users are keyed by registry name, whatever the provider calls itself.
        info.provider_name = provider_name.to_string();

        let user = match self
            .user_store
            .get_user_by_provider_id(provider_name, &info.external_id)
            .await
        {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                let user = self.user_store.create_user(&info).await.map_err(|e| {
                    AuthError::wrap(
                        AuthErrorKind::UserCreationFailed,
                        "Failed to create user",
                        e,
                    )
                })?;
                tracing::info!(
                    provider = provider_name,
                    user_id = %user.id(),
                    "User created on first login"
                );
                user
            }
            Err(e) => {
                return Err(AuthError::wrap(
                    AuthErrorKind::DatabaseError,
                    "Failed to look up user",
                    e,
                ));
            }
        };

        let session = self.create_session(user.id().clone()).await?;

        tracing::info!(
            provider = provider_name,
            user_id = %session.user_id,
            "User logged in"
        );

        Ok(session)
    }

    /// Open a session for `user_id`, expiring after the configured TTL
    pub async fn create_session(&self, user_id: UserId) -> AuthResult<Session> {
        let session = Session::new(SessionId::new(random_token()), user_id, self.session_ttl);

        self.session_store
            .create_session(&session)
            .await
            .map_err(|e| {
                AuthError::wrap(
                    AuthErrorKind::SessionCreationFailed,
                    "Failed to create session",
                    e,
                )
            })?;

        tracing::info!(user_id = %session.user_id, expires_at = %session.expires_at, "Session created");

        Ok(session)
    }

    pub async fn get_session(&self, session_id: &SessionId) -> AuthResult<Session> {
        if session_id.is_empty() {
            return Err(AuthError::invalid_session_id("No session ID provided"));
        }

        match self.session_store.get_session(session_id).await {
            Ok(session) => Ok(session),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Session not found or expired");
                Err(AuthError::wrap(
                    AuthErrorKind::UserSessionNotFound,
                    "Session not found",
                    e,
                ))
            }
            Err(e) => Err(AuthError::wrap(
                AuthErrorKind::DatabaseError,
                "Failed to get session",
                e,
            )),
        }
    }

    pub async fn delete_session(&self, session_id: &SessionId) -> AuthResult<()> {
        match self.session_store.delete_session(session_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(AuthError::wrap(
                AuthErrorKind::SessionDeletionFailed,
                "Failed to delete session",
                e,
            )),
            Err(e) => Err(AuthError::wrap(
                AuthErrorKind::DatabaseError,
                "Failed to delete session",
                e,
            )),
        }
    }

    /// End the session
    pub async fn logout(&self, session_id: &SessionId) -> AuthResult<()> {
        self.delete_session(session_id).await?;
        tracing::info!("User logged out");
        Ok(())
    }
}
