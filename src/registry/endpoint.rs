//! Endpoint URL normalization.
//!
//! # Responsibilities
//! - Canonicalize base URLs before they are used as keys or targets
//! - Reject endpoints that are not absolute http(s) URLs
//!
//! # Design Decisions
//! - Normalization is purely textual (trim + strip trailing slashes) so that
//!   the stored value is exactly what operators typed, minus noise
//! - Validation goes through `url::Url` for scheme and host checks

use url::Url;

/// Errors raised when an endpoint URL is not usable as a routing target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint url is empty")]
    Empty,

    #[error("endpoint url {url:?} is not a valid url: {reason}")]
    Invalid { url: String, reason: String },

    #[error("endpoint url {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("endpoint url {0:?} has no host")]
    MissingHost(String),
}

/// Trim incidental whitespace and trailing slashes.
///
/// `" http://localhost:9000/ "` becomes `"http://localhost:9000"`.
pub fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Normalize and check that the result is an absolute http(s) base URL.
pub fn validate_endpoint(raw: &str) -> Result<String, EndpointError> {
    let normalized = normalize_url(raw);
    if normalized.is_empty() {
        return Err(EndpointError::Empty);
    }

    let parsed = Url::parse(&normalized).map_err(|e| EndpointError::Invalid {
        url: normalized.clone(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(EndpointError::UnsupportedScheme(normalized)),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(EndpointError::MissingHost(normalized));
    }

    Ok(normalized)
}

/// Split a comma separated router list into normalized, non-empty URLs.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_url)
        .filter(|url| !url.is_empty())
        .collect()
}
