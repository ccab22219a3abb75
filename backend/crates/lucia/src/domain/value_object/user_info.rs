//! Provider User Info
//!
//! The normalized identity a provider returns for an access token.

use serde::Serialize;

use crate::domain::value_object::oauth_token::OAuthToken;

/// Normalized provider identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    /// The provider's identifier for the user, always as a string
    pub external_id: String,
    /// May be empty when the provider exposes no email
    pub email: String,
    pub name: String,
    /// Registry name of the provider that produced this record
    pub provider_name: String,
    pub profile_picture: Option<String>,
    /// Token the info was fetched with
    #[serde(skip)]
    pub token: OAuthToken,
}
