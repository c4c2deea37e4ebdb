//! Fiskal API - HTTP server carrying the authentication core
//!
//! Provides token-based authentication, role gating, per-request tenant
//! scoping, and request throttling for the invoicing backend.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
