//! OAuth providers

pub mod github;
pub mod google;
mod oauth_http;

pub use github::GitHubProvider;
pub use google::GoogleProvider;
pub use oauth_http::ProviderEndpoints;
