//! Destination URL checks for targeting rules and variants.

use serde_json::json;
use url::Url;

use crate::error::AppError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

impl From<UrlNormalizationError> for AppError {
    fn from(e: UrlNormalizationError) -> Self {
        AppError::bad_request("Invalid destination URL", json!({ "url": e.to_string() }))
    }
}

/// Canonicalizes a redirect destination.
///
/// Only absolute `http`/`https` URLs with a host are accepted. The host is
/// lowercased, default ports are dropped and the fragment is kept, since a
/// destination fragment is meaningful to the landing page. Path and query keep
/// their case.
///
/// # Errors
///
/// Returns [`UrlNormalizationError`] for malformed URLs, other schemes
/// (`javascript:`, `data:`, `ftp:` ...) or URLs without a host.
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let url =
        Url::parse(input.trim()).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlNormalizationError::UnsupportedProtocol);
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlNormalizationError::MissingHost);
    }

    // `Url` already lowercases hosts of special schemes and strips their
    // default port during parsing.
    Ok(url.to_string())
}
