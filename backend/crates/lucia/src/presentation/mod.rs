//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::LuciaState;
pub use middleware::{CurrentSession, require_auth, resolve_session};
pub use router::lucia_router;
