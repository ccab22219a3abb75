//! Store Traits
//!
//! Interfaces for user and session persistence. Implementations are in the
//! infrastructure layer.
//!
//! Stores report failures with kernel API errors: `NotFound` for missing
//! records, `Conflict` for duplicates, `BadRequest` for dangling references
//! and `Database` for everything else.

use kernel::error::app_error::AppResult;
use kernel::id::SessionId;

use crate::domain::entity::{session::Session, user::AuthUser};
use crate::domain::value_object::user_info::UserInfo;

/// User store trait
#[trait_variant::make(UserStore: Send)]
pub trait LocalUserStore {
    type User: AuthUser;

    /// Find the user linked to a provider identity
    async fn get_user_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> AppResult<Self::User>;

    /// Create a user for a provider identity, generating its id
    async fn create_user(&self, info: &UserInfo) -> AppResult<Self::User>;
}

/// Session store trait
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Persist a new session
    async fn create_session(&self, session: &Session) -> AppResult<()>;

    /// Load a live session. Expired sessions are removed and reported as
    /// not found.
    async fn get_session(&self, session_id: &SessionId) -> AppResult<Session>;

    /// Remove a session
    async fn delete_session(&self, session_id: &SessionId) -> AppResult<()>;
}
