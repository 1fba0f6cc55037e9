//! API-key authentication for the ingress surface.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use std::collections::HashSet;

pub const API_KEY_HEADER: &str = "x-api-key";

/// An empty configured key set refuses every request outright; a missing
/// header is `AuthRequired`, a wrong key is `Forbidden`.
pub fn authorize(headers: &HeaderMap, keys: &HashSet<String>) -> ApiResult<()> {
    if keys.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let Some(provided) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) else {
        return Err(ApiError::AuthRequired);
    };
    if !keys.contains(provided) {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys(values: &[&str]) -> HashSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_key_set_refuses_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("whatever"));
        assert!(matches!(
            authorize(&headers, &HashSet::new()),
            Err(ApiError::AuthRequired)
        ));
    }

    #[test]
    fn missing_header_is_auth_required() {
        assert!(matches!(
            authorize(&HeaderMap::new(), &keys(&["k1"])),
            Err(ApiError::AuthRequired)
        ));
    }

    #[test]
    fn wrong_key_is_forbidden() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("nope"));
        assert!(matches!(
            authorize(&headers, &keys(&["k1"])),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn known_key_passes() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("k1"));
        assert!(authorize(&headers, &keys(&["k1", "k2"])).is_ok());
    }
}
