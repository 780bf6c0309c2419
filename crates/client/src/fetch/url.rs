//! URL resolution for worker requests.
//!
//! Pages address assets relative to the origin the worker is registered for;
//! everything is resolved to an absolute URL before it reaches the cache.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Schemes the worker treats as network traffic.
pub fn uses_network_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Parse the origin a worker is registered for.
///
/// Must be an absolute http(s) URL. The path is forced to end in `/` so that
/// relative asset paths resolve beneath it.
pub fn parse_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut origin = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if !uses_network_scheme(&origin) {
        return Err(UrlError::UnsupportedScheme(origin.scheme().to_string()));
    }

    if !origin.path().ends_with('/') {
        let path = format!("{}/", origin.path());
        origin.set_path(&path);
    }
    origin.set_query(None);
    origin.set_fragment(None);

    Ok(origin)
}

/// Resolve a request target against the origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs of any scheme are kept; anything else joins the origin
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    if let Some(host) = parsed.host_str()
        && host.chars().any(|c| c.is_ascii_uppercase())
    {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
