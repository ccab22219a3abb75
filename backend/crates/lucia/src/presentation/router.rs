//! Lucia Router

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

use crate::domain::repository::{SessionStore, UserStore};
use crate::presentation::handlers::{self, LuciaState};
use crate::presentation::middleware::require_auth;

/// Login, callback, logout and session routes.
///
/// `/session` needs [`resolve_session`](crate::presentation::middleware::resolve_session)
/// layered around the application, with the same state.
pub fn lucia_router<U, S>(state: LuciaState<U, S>) -> Router
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    Router::new()
        .route("/session", get(handlers::current_session))
        .route_layer(from_fn(require_auth))
        .route("/login/{provider}", get(handlers::login::<U, S>))
        .route("/login/{provider}/callback", get(handlers::callback::<U, S>))
        .route("/logout", post(handlers::logout::<U, S>))
        .with_state(state)
}
