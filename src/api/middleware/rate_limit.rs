//! Per-client rate limiting backed by the shared bucket store.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::net::{Ipv4Addr, SocketAddr};
use tracing::warn;

use crate::application::services::Admission;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip;

/// Header reporting tokens left in the client's most constrained band.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Admits or rejects a request through [`crate::application::services::RateLimiter`].
///
/// # Key Extraction
///
/// Buckets are keyed by client IP: the socket peer address, or the proxy
/// headers when `BEHIND_PROXY` is set (see [`client_ip`]).
///
/// # Limits
///
/// Both the sustained and the burst band must have a token. Denied requests never
/// reach the handler and get `429 Too Many Requests` with `Retry-After`.
///
/// # Errors
///
/// Returns 503 if the bucket store is down and the limiter fails closed.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/shorten", post(shorten_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::layer));
/// ```
pub async fn layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));

    let key = client_ip(request.headers(), peer, state.behind_proxy).to_string();

    match state.rate_limiter.admit(&key).await? {
        Admission::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(REMAINING_HEADER, HeaderValue::from(remaining));
            Ok(response)
        }
        Admission::Denied { retry_after } => {
            warn!("Rate limit exceeded for {} (retry in {:?})", key, retry_after);
            Err(AppError::rate_limited(retry_after))
        }
    }
}
