//! User Entity
//!
//! A local account linked to exactly one provider identity.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::Serialize;

use crate::domain::value_object::user_info::UserInfo;

/// What the auth service needs to know about a stored user.
///
/// Stores may return their own user type as long as it exposes the id.
pub trait AuthUser: Clone + Send + Sync + 'static {
    fn id(&self) -> &UserId;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_user_info(id: UserId, info: &UserInfo) -> Self {
        Self {
            id,
            provider: info.provider_name.clone(),
            provider_id: info.external_id.clone(),
            email: info.email.clone(),
            name: info.name.clone(),
            profile_picture: info.profile_picture.clone(),
            created_at: Utc::now(),
        }
    }
}

impl AuthUser for User {
    fn id(&self) -> &UserId {
        &self.id
    }
}
