//! In-Memory Store Implementations
//!
//! Process-local stores for development and tests. Each store guards one map
//! with a `tokio::sync::RwLock`.

use std::collections::HashMap;

use chrono::Utc;
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::{SessionId, UserId};
use platform::crypto::random_token;
use tokio::sync::RwLock;

use crate::domain::entity::{session::Session, user::User};
use crate::domain::repository::{SessionStore, UserStore};
use crate::domain::value_object::user_info::UserInfo;

/// Users keyed by id
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Insert a user as-is
    pub async fn insert(&self, user: User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AppError::conflict("User already exists"));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }
}

impl UserStore for MemoryUserStore {
    type User = User;

    async fn get_user_by_provider_id(&self, provider: &str, provider_id: &str) -> AppResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.provider == provider && user.provider_id == provider_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn create_user(&self, info: &UserInfo) -> AppResult<User> {
        let user = User::from_user_info(UserId::new(random_token()), info);
        self.insert(user.clone()).await?;
        Ok(user)
    }
}

/// Sessions keyed by id
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every expired session, returning how many were removed
    pub async fn cleanup_expired(&self) -> u64 {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let deleted = (before - sessions.len()) as u64;

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        deleted
    }
}

impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &Session) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(AppError::conflict("Session already exists"));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &SessionId) -> AppResult<Session> {
        let session = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Session not found"))?;

        if session.is_expired() {
            // Re-check under the write lock: the session may have been
            // replaced or removed since the read.
            let mut sessions = self.sessions.write().await;
            if sessions.get(session_id).is_some_and(Session::is_expired) {
                sessions.remove(session_id);
            }
            return Err(AppError::not_found("Session expired"));
        }

        Ok(session)
    }

    async fn delete_session(&self, session_id: &SessionId) -> AppResult<()> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("Session not found"))
    }
}
