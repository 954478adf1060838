//! Long URL validation.
//!
//! Only absolute `http`/`https` URLs with a non-empty host are accepted. Surrounding
//! whitespace is ignored; whitespace or control characters inside the URL are
//! rejected, never stripped, so the stored URL is exactly the validated one.

use url::Url;

/// Reasons a long URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Invalid URL - contains whitespace or control characters")]
    IllegalCharacter,

    #[error("Invalid URL scheme - must be http or https")]
    UnsupportedScheme,

    #[error("Invalid URL - missing host")]
    MissingHost,
}

/// Checks that `long_url` is an absolute http(s) URL with a host.
///
/// # Errors
///
/// Returns [`UrlValidationError::IllegalCharacter`] if the trimmed URL contains
/// whitespace or ASCII control characters,
/// [`UrlValidationError::InvalidFormat`] for unparseable or relative URLs,
/// [`UrlValidationError::UnsupportedScheme`] for anything but `http`/`https`, and
/// [`UrlValidationError::MissingHost`] when the host is empty.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_long_url("https://example.com/a?b=c").is_ok());
/// assert!(validate_long_url("ftp://example.com").is_err());
/// assert!(validate_long_url("example.com").is_err());
/// ```
pub fn validate_long_url(long_url: &str) -> Result<Url, UrlValidationError> {
    let trimmed = long_url.trim();

    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || c.is_ascii_control())
    {
        return Err(UrlValidationError::IllegalCharacter);
    }

    let url = Url::parse(trimmed)
        .map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}
