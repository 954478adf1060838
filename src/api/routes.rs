//! API route configuration.

use crate::api::handlers::{health_handler, redirect_handler, shorten_handler};
use crate::api::middleware::rate_limit;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Routes that create mappings, gated by the per-client rate limiter.
///
/// # Endpoints
///
/// - `POST /shorten` - Create a short URL
pub fn write_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route_layer(middleware::from_fn_with_state(state, rate_limit::layer))
}

/// Read-only routes, not rate limited.
///
/// # Endpoints
///
/// - `GET /health` - Store and cache reachability
/// - `GET /{code}` - Redirect to the long URL
pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
}
