//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the storage key for a normalized request.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage key for a request.
pub fn request_key(request: &Request) -> String {
    compute_request_key(request.method.as_str(), &request.cache_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use url::Url;

    #[test]
    fn test_key_stability() {
        let key1 = compute_request_key("GET", "https://example.com/");
        let key2 = compute_request_key("GET", "https://example.com/");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_different_method() {
        let get = compute_request_key("GET", "https://example.com/");
        let head = compute_request_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = Request::get(Url::parse("https://example.com/index.html#songs").unwrap());
        let b = Request::new(Method::Get, Url::parse("https://example.com/index.html").unwrap());
        assert_eq!(request_key(&a), request_key(&b));
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
