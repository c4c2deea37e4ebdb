//! API route definitions
//!
//! Per-request control flow: rate limiter, then the authentication gate,
//! then any role guard on the matched route group, then the handler.

use crate::auth::middleware::{auth_gate, require_role};
use crate::handlers::{auth, health, invoices};
use crate::middleware::{rate_limit_middleware, security_headers_middleware};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use fiskal_core::Role;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// API v1 routes
fn api_routes() -> Router<Arc<AppState>> {
    // Public routes (the gate skips these per the route table)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Authenticated routes
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/password", post(auth::change_password_handler))
        .route("/invoices", get(invoices::list_invoices))
        .route("/invoices/:id", get(invoices::get_invoice));

    // Admin-only routes; the role guard runs after the gate and fails
    // closed if no identity was resolved.
    let admin_routes = Router::new()
        .route("/admin/users/:id", get(auth::get_user_handler))
        .route_layer(middleware::from_fn(require_role(&[Role::Admin])));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Build the application router with the full middleware stack.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
