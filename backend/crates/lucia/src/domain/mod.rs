//! Domain Layer
//!
//! Contains entities, value objects, the provider contract and store traits.

pub mod entity;
pub mod provider;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    session::Session,
    user::{AuthUser, User},
};
pub use provider::OAuthProvider;
pub use repository::{SessionStore, UserStore};
pub use value_object::{oauth_token::OAuthToken, user_info::UserInfo};
