//! Session Middleware
//!
//! `resolve_session` runs first and attaches the live [`Session`] to the
//! request; `require_auth` and [`CurrentSession`] read it back.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{FromRequestParts, OptionalFromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::SessionId;
use platform::cookie::{delete_cookie_header, extract_cookie};

use crate::domain::entity::session::Session;
use crate::domain::repository::{SessionStore, UserStore};
use crate::error::AuthError;
use crate::presentation::handlers::LuciaState;

/// Middleware that resolves the session cookie but doesn't require it.
///
/// A cookie that does not resolve (unknown, expired, store failure) leaves
/// the request unauthenticated and is cleared on the response.
pub async fn resolve_session<U, S>(
    State(state): State<LuciaState<U, S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let cookie_name = &state.config.session_cookie_name;

    let Some(session_id) = extract_cookie(req.headers(), cookie_name) else {
        tracing::debug!("No session cookie");
        return next.run(req).await;
    };

    match state.service.get_session(&SessionId::new(session_id)).await {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(e) => {
            if e.is_server_error() && !e.is_user_session_not_found() {
                tracing::warn!(error = %e, "Session lookup failed");
            } else {
                tracing::debug!(error = %e, "Session cookie rejected");
            }

            let mut response = next.run(req).await;

            // A handler that issued a fresh session cookie wins.
            let prefix = format!("{cookie_name}=");
            let replaced = response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .any(|v| v.to_str().is_ok_and(|v| v.starts_with(&prefix)));
            if !replaced {
                if let Some(clear) = delete_cookie_header(&state.config.session_cookie()) {
                    response.headers_mut().append(header::SET_COOKIE, clear);
                }
            }
            response
        }
    }
}

/// Middleware that requires a resolved session
pub async fn require_auth(req: Request<Body>, next: Next) -> Result<Response, AuthError> {
    if req.extensions().get::<Session>().is_none() {
        return Err(AuthError::unauthorized("Authentication required"));
    }
    Ok(next.run(req).await)
}

/// Extractor for the session attached by [`resolve_session`].
///
/// Use `Option<CurrentSession>` on routes where login is optional.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<St> FromRequestParts<St> for CurrentSession
where
    St: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))
    }
}

impl<St> OptionalFromRequestParts<St> for CurrentSession
where
    St: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &St,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().map(CurrentSession))
    }
}
