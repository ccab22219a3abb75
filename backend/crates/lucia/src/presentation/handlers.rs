//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use chrono::Utc;
use kernel::id::SessionId;
use platform::cookie::{delete_cookie_header, extract_cookie, set_cookie_header};
use platform::crypto::constant_time_eq;
use std::sync::Arc;

use crate::application::config::{ConfigError, LuciaConfig};
use crate::application::service::AuthService;
use crate::domain::entity::session::Session;
use crate::domain::repository::{SessionStore, UserStore};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{CallbackQuery, SessionResponse};
use crate::presentation::middleware::CurrentSession;

/// Shared state for lucia handlers and middleware
pub struct LuciaState<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    pub service: Arc<AuthService<U, S>>,
    pub config: Arc<LuciaConfig>,
}

impl<U, S> LuciaState<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    /// Sessions issued through this state live for `config.session_ttl`.
    pub fn new(service: AuthService<U, S>, config: LuciaConfig) -> Result<Self, ConfigError> {
        let session_ttl = config.session_ttl_delta()?;
        Ok(Self {
            service: Arc::new(service.with_session_ttl(session_ttl)),
            config: Arc::new(config),
        })
    }
}

// Manual impl: derive would require `U: Clone` and `S: Clone`.
impl<U, S> Clone for LuciaState<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}

fn location(url: &str) -> AuthResult<HeaderValue> {
    HeaderValue::from_str(url).map_err(|_| AuthError::internal())
}

// ============================================================================
// Login
// ============================================================================

/// GET /login/{provider}
pub async fn login<U, S>(
    State(state): State<LuciaState<U, S>>,
    Path(provider): Path<String>,
) -> AuthResult<Response>
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let (url, oauth_state) = state.service.get_auth_url(&provider)?;

    let state_cookie = set_cookie_header(&state.config.state_cookie(), &oauth_state)
        .ok_or_else(AuthError::internal)?;

    tracing::debug!(provider = %provider, "Redirecting to provider");

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, location(&url)?),
            (header::SET_COOKIE, state_cookie),
        ],
    )
        .into_response())
}

// ============================================================================
// Callback
// ============================================================================

/// GET /login/{provider}/callback
pub async fn callback<U, S>(
    State(state): State<LuciaState<U, S>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> AuthResult<Response>
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let clear_state =
        delete_cookie_header(&state.config.state_cookie()).ok_or_else(AuthError::internal)?;

    // The state is single use: it is cleared whether or not the login succeeds.
    let session = match verified_callback(&state, &provider, query, &headers).await {
        Ok(session) => session,
        Err(e) => {
            return Ok((AppendHeaders([(header::SET_COOKIE, clear_state)]), e).into_response());
        }
    };

    let session_cookie = state
        .config
        .session_cookie()
        .expiring_at(session.expires_at, Utc::now());
    let session_cookie =
        set_cookie_header(&session_cookie, session.id.as_str()).ok_or_else(AuthError::internal)?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, location(&state.config.login_redirect)?)],
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, clear_state),
        ]),
    )
        .into_response())
}

/// Check the OAuth state, then exchange the code for a session
async fn verified_callback<U, S>(
    state: &LuciaState<U, S>,
    provider: &str,
    query: CallbackQuery,
    headers: &HeaderMap,
) -> AuthResult<Session>
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    if let Some(error) = query.error {
        tracing::warn!(provider = %provider, error = %error, "Provider denied authorization");
        return Err(AuthError::invalid_credentials(format!(
            "Authorization denied: {error}"
        )));
    }

    let expected = extract_cookie(headers, &state.config.state_cookie_name)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::invalid_token("Missing OAuth state"))?;
    let received = query
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::invalid_token("Missing OAuth state"))?;
    if !constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        tracing::warn!(provider = %provider, "OAuth state mismatch");
        return Err(AuthError::invalid_token("OAuth state mismatch"));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::invalid_credentials("Missing authorization code"))?;

    state.service.handle_callback(provider, &code).await
}

// ============================================================================
// Logout
// ============================================================================

/// POST /logout
pub async fn logout<U, S>(
    State(state): State<LuciaState<U, S>>,
    headers: HeaderMap,
) -> AuthResult<Response>
where
    U: UserStore + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    if let Some(session_id) = extract_cookie(&headers, &state.config.session_cookie_name) {
        match state.service.logout(&SessionId::new(session_id)).await {
            Ok(()) => {}
            // Already gone: clearing the cookie is all that is left to do.
            Err(e) if e.is_session_deletion_failed() => {
                tracing::debug!(error = %e, "Logout without a live session");
            }
            Err(e) => return Err(e),
        }
    }

    let clear =
        delete_cookie_header(&state.config.session_cookie()).ok_or_else(AuthError::internal)?;

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear)]).into_response())
}

// ============================================================================
// Session
// ============================================================================

/// GET /session
pub async fn current_session(CurrentSession(session): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse::from(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::{MemorySessionStore, MemoryUserStore};
    use crate::presentation::router::lucia_router;
    use crate::presentation::middleware::resolve_session;
    use crate::testing::FakeProvider;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::middleware::from_fn_with_state;
    use kernel::id::UserId;
    use tower::ServiceExt;

    type TestState = LuciaState<MemoryUserStore, MemorySessionStore>;

    fn state_with(provider: FakeProvider, config: LuciaConfig) -> TestState {
        let service = AuthService::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
        )
        .with_provider("google", Arc::new(provider));
        LuciaState::new(service, config).unwrap()
    }

    fn state() -> TestState {
        state_with(FakeProvider::new("g-1"), LuciaConfig::default())
    }

    fn callback_request(query: &str, cookie: &str) -> Request<Body> {
        Request::get(format!("/login/google/callback?{query}"))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn clears_state(response: &Response) -> bool {
        set_cookies(response)
            .iter()
            .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0"))
    }

    fn app(state: TestState) -> Router {
        lucia_router(state.clone()).layer(from_fn_with_state(
            state,
            resolve_session::<MemoryUserStore, MemorySessionStore>,
        ))
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_redirects_with_state_cookie() {
        let response = app(state())
            .oneshot(Request::get("/login/google").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://fake.test/authorize?state="));

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("oauth_state="));
        assert!(cookies[0].contains("Max-Age=600"));

        let state_value = location.split("state=").nth(1).unwrap();
        assert!(cookies[0].starts_with(&format!("oauth_state={state_value};")));
    }

    #[tokio::test]
    async fn test_login_unknown_provider() {
        let response = app(state())
            .oneshot(Request::get("/login/gitlab").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["error"], "Unknown provider: gitlab");
    }

    #[tokio::test]
    async fn test_callback_sets_session_cookie() {
        let state = state();
        let response = app(state.clone())
            .oneshot(
                Request::get("/login/google/callback?code=abc&state=st")
                    .header(header::COOKIE, "oauth_state=st")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let cookies = set_cookies(&response);
        let session_cookie = cookies
            .iter()
            .find(|c| c.starts_with("auth_session="))
            .unwrap();
        assert!(session_cookie.contains("HttpOnly"));
        assert!(session_cookie.contains("Secure"));
        assert!(session_cookie.contains("SameSite=Lax"));
        assert!(
            session_cookie.contains("Max-Age=86400") || session_cookie.contains("Max-Age=86399")
        );
        assert!(
            cookies
                .iter()
                .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0"))
        );

        let session_id = session_cookie
            .trim_start_matches("auth_session=")
            .split(';')
            .next()
            .unwrap();
        let session = state
            .service
            .get_session(&SessionId::new(session_id))
            .await
            .unwrap();
        assert_eq!(state.service.session_store().len().await, 1);
        assert!(!session.user_id.is_empty());
    }

    #[tokio::test]
    async fn test_callback_rejects_state_mismatch() {
        let state = state();
        let response = app(state.clone())
            .oneshot(
                Request::get("/login/google/callback?code=abc&state=forged")
                    .header(header::COOKIE, "oauth_state=st")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(clears_state(&response));
        assert!(state.service.user_store().is_empty().await);
    }

    #[tokio::test]
    async fn test_callback_rejects_empty_state() {
        for (query, cookie) in [
            ("code=abc", "oauth_state="),
            ("code=abc&state=", "oauth_state="),
            ("code=abc&state=", "oauth_state=st"),
        ] {
            let state = state();
            let response = app(state.clone())
                .oneshot(callback_request(query, cookie))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{query} / {cookie}");
            assert_eq!(json(response).await["error"], "Missing OAuth state");
            assert!(state.service.user_store().is_empty().await);
            assert!(state.service.session_store().is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_clears_state_cookie() {
        let provider = FakeProvider {
            fail_exchange: true,
            ..FakeProvider::new("g-1")
        };
        let state = state_with(provider, LuciaConfig::default());
        let response = app(state.clone())
            .oneshot(callback_request("code=abc&state=st", "oauth_state=st"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(clears_state(&response));
        assert!(state.service.session_store().is_empty().await);
    }

    #[tokio::test]
    async fn test_configured_session_ttl_applies() {
        let config = LuciaConfig {
            session_ttl: std::time::Duration::from_secs(3600),
            ..LuciaConfig::default()
        };
        let state = state_with(FakeProvider::new("g-1"), config);
        let response = app(state.clone())
            .oneshot(callback_request("code=abc&state=st", "oauth_state=st"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let session_cookie = set_cookies(&response)
            .into_iter()
            .find(|c| c.starts_with("auth_session="))
            .unwrap();
        assert!(session_cookie.contains("Max-Age=3600") || session_cookie.contains("Max-Age=3599"));

        let session_id = session_cookie
            .trim_start_matches("auth_session=")
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let session = state
            .service
            .get_session(&SessionId::new(session_id))
            .await
            .unwrap();
        let expected = Utc::now() + chrono::Duration::hours(1);
        assert!((session.expires_at - expected).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn test_callback_without_state_cookie() {
        let response = app(state())
            .oneshot(
                Request::get("/login/google/callback?code=abc&state=st")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["error"], "Missing OAuth state");
    }

    #[tokio::test]
    async fn test_callback_provider_denied() {
        let response = app(state())
            .oneshot(
                Request::get("/login/google/callback?error=access_denied&state=st")
                    .header(header::COOKIE, "oauth_state=st")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_requires_auth() {
        let response = app(state())
            .oneshot(Request::get("/session").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_returns_current_session() {
        let state = state();
        let session = state
            .service
            .create_session(UserId::new("u-42"))
            .await
            .unwrap();

        let response = app(state)
            .oneshot(
                Request::get("/session")
                    .header(header::COOKIE, format!("auth_session={}", session.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["userId"], "u-42");
    }

    #[tokio::test]
    async fn test_logout_deletes_session_and_clears_cookie() {
        let state = state();
        let session = state
            .service
            .create_session(UserId::new("u-1"))
            .await
            .unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::post("/logout")
                    .header(header::COOKIE, format!("auth_session={}", session.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("auth_session=;") && c.contains("Max-Age=0"))
        );
        assert!(state.service.session_store().is_empty().await);
    }

    #[tokio::test]
    async fn test_logout_without_session_still_clears_cookie() {
        let response = app(state())
            .oneshot(Request::post("/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(set_cookies(&response).len(), 1);
    }
}
