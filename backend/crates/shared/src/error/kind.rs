//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes.

use serde::Serialize;

/// Closed set of API error kinds.
///
/// Each variant maps to exactly one HTTP status code. Kinds that describe
/// a server-side failure (`Parse`, `Unexpected`, `Database`) all map to 500.
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::NotFound;
/// assert_eq!(kind.status_code(), 404);
/// assert_eq!(kind.as_str(), "NotFound");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// 500 - input from a collaborator could not be parsed
    Parse,
    /// 500 - transport or decoding failure, anything not otherwise classified
    Unexpected,
    /// 500 - storage query failed
    Database,
    /// 404 - resource does not exist
    NotFound,
    /// 400 - request is malformed or violates a constraint
    BadRequest,
    /// 403 - caller is known but not allowed
    Forbidden,
    /// 401 - authentication missing or rejected
    Unauthorized,
    /// 409 - conflicts with current state
    Conflict,
    /// 503 - dependency temporarily unavailable
    ServiceUnavailable,
}

impl ErrorKind {
    /// HTTP status code for this kind
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::BadRequest.status_code(), 400);
    /// assert_eq!(ErrorKind::Database.status_code(), 500);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Parse | ErrorKind::Unexpected | ErrorKind::Database => 500,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Conflict => 409,
            ErrorKind::ServiceUnavailable => 503,
        }
    }

    /// Stable tag used in logs and `Display` output
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::Unexpected => "UnexpectedError",
            ErrorKind::Database => "DatabaseError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    /// 5xx kinds. These should be logged.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// 4xx kinds.
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
