//! Handler for the shortening endpoint.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, error};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "longUrl": "https://example.com",
///   "customAlias": "promo",                   // optional
///   "expirationDate": "2026-03-01T12:00:00Z"  // optional
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the short URL in `Location` and the body:
///
/// ```json
/// {
///   "shortUrl": "https://sho.rt/promo",
///   "longUrl": "https://example.com",
///   "expirationDate": "2026-03-01T12:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 for a malformed URL or alias, or an out-of-range expiry
/// - 409 if the alias is taken
/// - 429 if the client is over its rate limit (see [`crate::api::middleware::rate_limit`])
/// - 503 if the store is unavailable
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Shortening URL request: {}", payload.long_url);

    payload.validate().inspect_err(|_| record_failure(true))?;

    let mapping = state
        .mapping_service
        .create(&payload.long_url, payload.alias(), payload.expiration_date)
        .await
        .inspect_err(|e| match e {
            AppError::InvalidInput { .. } | AppError::AliasTaken { .. } => record_failure(true),
            _ => {
                error!("Failed to shorten URL {}: {}", payload.long_url, e);
                record_failure(false);
            }
        })?;

    let short_url = state.short_url(&mapping.code);
    metrics::counter!("shorten_requests_total", "outcome" => "success").increment(1);
    debug!("Created short URL {}", short_url);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, short_url.clone())],
        Json(ShortenResponse {
            short_url,
            long_url: mapping.long_url,
            expiration_date: mapping.expires_at,
        }),
    ))
}

fn record_failure(user_error: bool) {
    let outcome = if user_error { "user_error" } else { "error" };
    metrics::counter!("shorten_requests_total", "outcome" => outcome).increment(1);
}
