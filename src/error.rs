//! Application error type and its HTTP mapping.
//!
//! Every fallible operation in the service layer returns [`AppError`]. The variants
//! mirror the failure classes a caller has to distinguish:
//!
//! | Variant                  | Status | Retry? |
//! |--------------------------|--------|--------|
//! | `InvalidInput`           | 400    | no     |
//! | `AliasTaken`             | 409    | with another alias |
//! | `NotFound`               | 404    | no     |
//! | `RateLimited`            | 429    | after `retry_after` |
//! | `DependencyUnavailable`  | 503    | yes    |
//! | `Internal`               | 500    | no     |

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Error payload returned in API responses.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    InvalidInput { message: String, details: Value },

    #[error("{message}")]
    AliasTaken { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("rate limit exceeded, retry after {}ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("{message}")]
    DependencyUnavailable { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details,
        }
    }

    pub fn alias_taken(code: &str) -> Self {
        Self::AliasTaken {
            message: "Alias already exists".to_string(),
            details: json!({ "code": code }),
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::DependencyUnavailable {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns true for failures a caller may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DependencyUnavailable { .. } | Self::RateLimited { .. }
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::AliasTaken { .. } => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into the serialisable payload used in responses.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (code, details) = match self {
            Self::InvalidInput { details, .. } => ("invalid_input", details.clone()),
            Self::AliasTaken { details, .. } => ("alias_taken", details.clone()),
            Self::NotFound { details, .. } => ("not_found", details.clone()),
            Self::RateLimited { retry_after } => (
                "rate_limited",
                json!({ "retry_after_ms": retry_after.as_millis() as u64 }),
            ),
            Self::DependencyUnavailable { details, .. } => {
                ("dependency_unavailable", details.clone())
            }
            Self::Internal { details, .. } => ("internal_error", details.clone()),
        };

        ErrorInfo {
            code,
            message: self.to_string(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            // Retry-After is whole seconds; round up so clients never retry early.
            Self::RateLimited { retry_after } => {
                Some(retry_after.as_millis().div_ceil(1000).max(1) as u64)
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_error_info(),
        };
        let mut response = (status, Json(body)).into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::AliasTaken {
                message: "Alias already exists".to_string(),
                details: json!({ "constraint": db.constraint() }),
            };
        }

        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
                AppError::unavailable("Store unavailable", json!({ "reason": e.to_string() }))
            }
            _ => AppError::internal("Database error", json!({})),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::invalid_input("Request validation failed", json!(e))
    }
}
