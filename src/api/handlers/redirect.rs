//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look the code up, cache first (a hit slides the cache TTL)
/// 2. On a cache miss, read the store and populate the cache in the background
/// 3. Treat a mapping past its expiry as missing, swept or not
/// 4. Return 301 Moved Permanently
///
/// # Errors
///
/// Returns 404 Not Found if the code doesn't exist or has expired.
/// Returns 503 Service Unavailable if the store is unreachable on a cache miss.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Expanding short URL: {}", code);

    let mapping = match state.mapping_service.resolve_live(&code).await {
        Ok(mapping) => mapping,
        Err(e @ AppError::NotFound { .. }) => {
            warn!("Short URL not found: {}", code);
            metrics::counter!("redirect_requests_total", "outcome" => "not_found").increment(1);
            return Err(e);
        }
        Err(e) => {
            metrics::counter!("redirect_requests_total", "outcome" => "error").increment(1);
            return Err(e);
        }
    };

    metrics::counter!("redirect_requests_total", "outcome" => "success").increment(1);
    debug!("Redirecting {} to {}", code, mapping.long_url);

    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, mapping.long_url)],
    ))
}
