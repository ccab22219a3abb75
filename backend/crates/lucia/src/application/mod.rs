//! Application Layer
//!
//! The auth service and its configuration.

pub mod config;
pub mod service;

pub use config::{ConfigError, LuciaConfig, ProviderCredentials};
pub use service::AuthService;
