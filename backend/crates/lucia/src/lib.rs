//! Lucia - OAuth Login and Session Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, token/user-info values, provider and store traits
//! - `application/` - The auth service and its configuration
//! - `infra/` - In-memory and PostgreSQL stores, Google and GitHub providers
//! - `presentation/` - HTTP handlers, DTOs, router, session middleware
//!
//! ## Flow
//! 1. `GET /login/{provider}` redirects to the provider with a fresh state,
//!    remembered in a short-lived cookie
//! 2. `GET /login/{provider}/callback` checks the state, exchanges the code,
//!    finds or creates the user and opens a server-side session
//! 3. The session id travels in the `auth_session` cookie; `resolve_session`
//!    turns it back into a [`Session`] on every request

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use application::config::{ConfigError, LuciaConfig, ProviderCredentials};
pub use application::service::AuthService;
pub use domain::{AuthUser, OAuthProvider, OAuthToken, Session, SessionStore, User, UserInfo, UserStore};
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use infra::{GitHubProvider, GoogleProvider, MemorySessionStore, MemoryUserStore, PgLuciaStore};
pub use presentation::{CurrentSession, LuciaState, lucia_router, require_auth, resolve_session};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
pub use kernel::id::{SessionId, UserId};
