//! Auth Error Types
//!
//! The auth-specific error family. It parallels `kernel::error::AppError`:
//! a closed set of kinds, a message that is safe to show to clients, and an
//! optional source kept for logs.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;

use crate::application::config::ConfigError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Closed set of auth error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    UnknownProvider,
    TokenExchangeError,
    UserInfoError,
    UserCreationFailed,
    DatabaseError,
    SessionCreationFailed,
    SessionDeletionFailed,
    UserSessionNotFound,
    InvalidSessionId,
    SessionExpired,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    DuplicateUserError,
    Unauthorized,
    Configuration,
    Unexpected,
}

impl AuthErrorKind {
    /// HTTP status code for this kind
    pub const fn status_code(&self) -> StatusCode {
        match self {
            AuthErrorKind::InvalidSessionId => StatusCode::BAD_REQUEST,
            AuthErrorKind::Unauthorized
            | AuthErrorKind::SessionExpired
            | AuthErrorKind::InvalidCredentials
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthErrorKind::DuplicateUserError => StatusCode::CONFLICT,
            AuthErrorKind::UnknownProvider
            | AuthErrorKind::TokenExchangeError
            | AuthErrorKind::UserInfoError
            | AuthErrorKind::UserCreationFailed
            | AuthErrorKind::DatabaseError
            | AuthErrorKind::SessionCreationFailed
            | AuthErrorKind::SessionDeletionFailed
            | AuthErrorKind::UserSessionNotFound
            | AuthErrorKind::Configuration
            | AuthErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::UnknownProvider => "UnknownProvider",
            AuthErrorKind::TokenExchangeError => "TokenExchangeError",
            AuthErrorKind::UserInfoError => "UserInfoError",
            AuthErrorKind::UserCreationFailed => "UserCreationFailed",
            AuthErrorKind::DatabaseError => "DatabaseError",
            AuthErrorKind::SessionCreationFailed => "SessionCreationFailed",
            AuthErrorKind::SessionDeletionFailed => "SessionDeletionFailed",
            AuthErrorKind::UserSessionNotFound => "UserSessionNotFound",
            AuthErrorKind::InvalidSessionId => "InvalidSessionId",
            AuthErrorKind::SessionExpired => "SessionExpired",
            AuthErrorKind::InvalidCredentials => "InvalidCredentials",
            AuthErrorKind::InvalidToken => "InvalidToken",
            AuthErrorKind::TokenExpired => "TokenExpired",
            AuthErrorKind::DuplicateUserError => "DuplicateUserError",
            AuthErrorKind::Unauthorized => "Unauthorized",
            AuthErrorKind::Configuration => "ConfigurationError",
            AuthErrorKind::Unexpected => "UnexpectedError",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auth error: kind, client-facing message, optional source
pub struct AuthError {
    kind: AuthErrorKind,
    message: Cow<'static, str>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Wrap a store or provider failure, keeping its message for context.
    pub(crate) fn wrap(kind: AuthErrorKind, context: &str, err: AppError) -> Self {
        Self::new(kind, format!("{context}: {}", err.message())).with_source(err)
    }

    pub fn unknown_provider(name: &str) -> Self {
        Self::new(
            AuthErrorKind::UnknownProvider,
            format!("Unknown provider: {name}"),
        )
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidToken, message)
    }

    pub fn invalid_credentials(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidCredentials, message)
    }

    pub fn invalid_session_id(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidSessionId, message)
    }

    /// Generic 500 that reveals nothing about the cause
    pub fn internal() -> Self {
        Self::new(AuthErrorKind::Unexpected, "Internal Server Error")
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_unknown_provider(&self) -> bool {
        self.kind == AuthErrorKind::UnknownProvider
    }

    pub fn is_token_exchange_error(&self) -> bool {
        self.kind == AuthErrorKind::TokenExchangeError
    }

    pub fn is_user_info_error(&self) -> bool {
        self.kind == AuthErrorKind::UserInfoError
    }

    pub fn is_user_creation_failed(&self) -> bool {
        self.kind == AuthErrorKind::UserCreationFailed
    }

    pub fn is_database_error(&self) -> bool {
        self.kind == AuthErrorKind::DatabaseError
    }

    pub fn is_session_creation_failed(&self) -> bool {
        self.kind == AuthErrorKind::SessionCreationFailed
    }

    pub fn is_session_deletion_failed(&self) -> bool {
        self.kind == AuthErrorKind::SessionDeletionFailed
    }

    pub fn is_user_session_not_found(&self) -> bool {
        self.kind == AuthErrorKind::UserSessionNotFound
    }

    pub fn is_invalid_session_id(&self) -> bool {
        self.kind == AuthErrorKind::InvalidSessionId
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == AuthErrorKind::SessionExpired
    }

    pub fn is_invalid_credentials(&self) -> bool {
        self.kind == AuthErrorKind::InvalidCredentials
    }

    pub fn is_invalid_token(&self) -> bool {
        self.kind == AuthErrorKind::InvalidToken
    }

    pub fn is_token_expired(&self) -> bool {
        self.kind == AuthErrorKind::TokenExpired
    }

    pub fn is_duplicate_user(&self) -> bool {
        self.kind == AuthErrorKind::DuplicateUserError
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == AuthErrorKind::Unauthorized
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self.kind {
            AuthErrorKind::DatabaseError
            | AuthErrorKind::UserCreationFailed
            | AuthErrorKind::SessionCreationFailed
            | AuthErrorKind::Configuration
            | AuthErrorKind::Unexpected => {
                tracing::error!(kind = %self.kind, error = ?self.source, message = %self.message, "Auth error");
            }
            AuthErrorKind::TokenExchangeError | AuthErrorKind::UserInfoError => {
                tracing::warn!(kind = %self.kind, message = %self.message, "OAuth provider call failed");
            }
            AuthErrorKind::InvalidToken | AuthErrorKind::InvalidCredentials => {
                tracing::warn!(message = %self.message, "Rejected login attempt");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AuthError");
        builder.field("kind", &self.kind);
        builder.field("message", &self.message);
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lucia error - {}: {}", self.kind, self.message)
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        Self::new(AuthErrorKind::Configuration, err.to_string()).with_source(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let body = serde_json::json!({ "error": self.message() });
        (self.status_code(), Json(body)).into_response()
    }
}
