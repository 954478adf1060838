//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /shorten`     - Create a short URL (rate limited)
//! - `GET  /health`      - Health check: store, cache, sweeper counters
//! - `GET  /{code}`      - Short link redirect
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-client token buckets on the write route
//! - **Path normalization** - Trailing slash handling

use crate::api::middleware::tracing;
use crate::api::routes::{read_routes, write_routes};
use crate::state::AppState;
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// Static routes win over `/{code}`, so `shorten` and `health` are never
/// treated as codes; they are also rejected as custom aliases.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .merge(write_routes(state.clone()))
        .merge(read_routes())
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
