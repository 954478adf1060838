//! DTOs for the shortening endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::sync::LazyLock;
use validator::Validate;

/// Either blank (treated as no alias) or 1-64 URL-safe characters.
static CUSTOM_ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*|[A-Za-z0-9_-]{1,64})$").unwrap());

/// Request to shorten a URL.
///
/// ```json
/// {
///   "longUrl": "https://example.com/some/page",
///   "customAlias": "promo",
///   "expirationDate": "2026-03-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    /// The original URL to shorten (must be HTTP/HTTPS with a host).
    #[validate(length(min = 1, max = 8192, message = "URL must not be empty"))]
    pub long_url: String,

    /// Optional caller-chosen code. Blank values are ignored.
    #[validate(regex(
        path = "*CUSTOM_ALIAS_REGEX",
        message = "Alias must be 1-64 letters, digits, hyphens or underscores"
    ))]
    pub custom_alias: Option<String>,

    /// Optional expiry. Defaults to the configured default expiry.
    pub expiration_date: Option<DateTime<Utc>>,
}

impl ShortenRequest {
    /// The alias to use, if a non-blank one was given.
    pub fn alias(&self) -> Option<&str> {
        self.custom_alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    pub long_url: String,
    pub expiration_date: Option<DateTime<Utc>>,
}
