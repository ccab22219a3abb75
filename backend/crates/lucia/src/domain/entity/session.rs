//! Session Entity
//!
//! A server-side login session referenced by the session cookie.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{SessionId, UserId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session that expires `ttl` from now
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(id: SessionId, user_id: UserId, ttl: Duration) -> Self {
        Self {
            id,
            user_id,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// A session is valid up to and including its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Seconds left until expiry, zero once expired
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(ttl: Duration) -> Session {
        Session::new(SessionId::new("s1"), UserId::new("u1"), ttl)
    }

    #[test]
    fn test_new_session_expires_after_ttl() {
        let before = Utc::now();
        let s = session(Duration::hours(24));
        let after = Utc::now();

        assert!(s.expires_at >= before + Duration::hours(24));
        assert!(s.expires_at <= after + Duration::hours(24));
        assert!(!s.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let s = session(Duration::hours(1));

        assert!(!s.is_expired_at(s.expires_at));
        assert!(s.is_expired_at(s.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_remaining_secs_never_negative() {
        let s = session(Duration::seconds(-30));
        assert_eq!(s.remaining_secs(Utc::now()), 0);
    }
}
