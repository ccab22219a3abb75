//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, constant-time comparison)
//! - Cookie management

pub mod cookie;
pub mod crypto;
