//! PostgreSQL Store Implementation

use chrono::{DateTime, Utc};
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::{SessionId, UserId};
use platform::crypto::random_token;
use sqlx::PgPool;

use crate::domain::entity::{session::Session, user::User};
use crate::domain::repository::{SessionStore, UserStore};
use crate::domain::value_object::user_info::UserInfo;

/// PostgreSQL-backed user and session store
#[derive(Clone)]
pub struct PgLuciaStore {
    pool: PgPool,
}

impl PgLuciaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let deleted = sqlx::query("DELETE FROM lucia_sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}

/// Map insert failures, turning constraint violations into client-class
/// errors and leaving everything else to the kernel conversion.
fn map_insert_error(err: sqlx::Error, conflict: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::conflict(conflict).with_source(err);
        }
        if db_err.is_foreign_key_violation() {
            return AppError::bad_request("Invalid user ID").with_source(err);
        }
    }
    AppError::from(err)
}

// ============================================================================
// User Store Implementation
// ============================================================================

impl UserStore for PgLuciaStore {
    type User = User;

    async fn get_user_by_provider_id(&self, provider: &str, provider_id: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, provider, provider_id, email, name, profile_picture, created_at
            FROM lucia_users
            WHERE provider = $1 AND provider_id = $2
            "#,
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn create_user(&self, info: &UserInfo) -> AppResult<User> {
        let user = User::from_user_info(UserId::new(random_token()), info);

        sqlx::query(
            r#"
            INSERT INTO lucia_users (
                id,
                provider,
                provider_id,
                email,
                name,
                profile_picture,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.profile_picture)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "User already exists"))?;

        Ok(user)
    }
}

// ============================================================================
// Session Store Implementation
// ============================================================================

impl SessionStore for PgLuciaStore {
    async fn create_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query("INSERT INTO lucia_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session.id.as_str())
            .bind(session.user_id.as_str())
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "Session already exists"))?;

        Ok(())
    }

    async fn get_session(&self, session_id: &SessionId) -> AppResult<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, expires_at FROM lucia_sessions WHERE id = $1",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let session = row
            .map(SessionRow::into_session)
            .ok_or_else(|| AppError::not_found("Session not found"))?;

        if session.is_expired() {
            // Best-effort: the session is gone for the caller either way.
            if let Err(e) = self.delete_session(session_id).await {
                if !e.is_not_found() {
                    tracing::warn!(error = %e, "Failed to delete expired session");
                }
            }
            return Err(AppError::not_found("Session expired"));
        }

        Ok(session)
    }

    async fn delete_session(&self, session_id: &SessionId) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM lucia_sessions WHERE id = $1")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::not_found("Session not found"));
        }

        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    provider: String,
    provider_id: String,
    email: String,
    name: String,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: UserId::new(self.id),
            provider: self.provider,
            provider_id: self.provider_id,
            email: self.email,
            name: self.name,
            profile_picture: self.profile_picture,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId::new(self.id),
            user_id: UserId::new(self.user_id),
            expires_at: self.expires_at,
        }
    }
}
