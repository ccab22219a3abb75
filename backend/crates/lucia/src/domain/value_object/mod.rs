//! Value Object Module

pub mod oauth_token;
pub mod user_info;
