//! Infrastructure Layer
//!
//! Store and provider implementations.

pub mod memory;
pub mod postgres;
pub mod providers;

pub use memory::{MemorySessionStore, MemoryUserStore};
pub use postgres::PgLuciaStore;
pub use providers::{GitHubProvider, GoogleProvider, ProviderEndpoints};
