//! Application Configuration
//!
//! Cookie and session settings for the login flow, plus provider
//! credentials read from the environment.

use std::time::Duration;

use platform::cookie::CookieConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Login flow configuration
#[derive(Debug, Clone)]
pub struct LuciaConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Cookie carrying the OAuth state between login and callback
    pub state_cookie_name: String,
    /// Session lifetime (24 hours)
    pub session_ttl: Duration,
    /// OAuth state lifetime (10 minutes)
    pub state_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Where the browser lands after a successful login
    pub login_redirect: String,
}

impl Default for LuciaConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "auth_session".to_string(),
            state_cookie_name: "oauth_state".to_string(),
            session_ttl: Duration::from_secs(24 * 3600), // 24 hours
            state_ttl: Duration::from_secs(10 * 60),     // 10 minutes
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            login_redirect: "/".to_string(),
        }
    }
}

impl LuciaConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Session TTL as a chrono duration
    pub fn session_ttl_delta(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::from_std(self.session_ttl).map_err(|e| ConfigError::Invalid {
            name: "session_ttl".to_string(),
            reason: e.to_string(),
        })
    }

    /// Base session cookie (no expiry attached yet)
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig::new(&self.session_cookie_name)
            .secure(self.cookie_secure)
            .same_site(self.cookie_same_site)
    }

    pub fn state_cookie(&self) -> CookieConfig {
        CookieConfig::new(&self.state_cookie_name)
            .secure(self.cookie_secure)
            .same_site(self.cookie_same_site)
            .max_age_secs(self.state_ttl.as_secs() as i64)
    }
}

/// OAuth client credentials for one provider
#[derive(Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl ProviderCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Read `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET` and
    /// `<PREFIX>_REDIRECT_URI` from the process environment.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], but `Ok(None)` when the client id is unset so
    /// a provider can be left unconfigured.
    pub fn from_env_optional(prefix: &str) -> Result<Option<Self>, ConfigError> {
        if std::env::var(format!("{prefix}_CLIENT_ID")).is_err() {
            return Ok(None);
        }
        Self::from_env(prefix).map(Some)
    }

    pub fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            match lookup(&name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(name)),
            }
        };

        let client_id = var("CLIENT_ID")?;
        let client_secret = var("CLIENT_SECRET")?;
        let redirect_uri = var("REDIRECT_URI")?;

        url::Url::parse(&redirect_uri).map_err(|e| ConfigError::Invalid {
            name: format!("{prefix}_REDIRECT_URI"),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}
