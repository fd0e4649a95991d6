//! Access token extraction

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

/// Cookie set by the Supabase auth helpers on the frontend
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

fn extract_token_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(ACCESS_TOKEN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|token| !token.is_empty())
                .map(String::from)
        })
}

/// Extract the access token from the Authorization header or the session
/// cookie. The header wins when both are present.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        if let Some(token) = header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    extract_token_from_cookie(headers)
}

/// The caller's access token, if any.
///
/// Never rejects: a missing token is reported by the billing flows as a
/// session failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub Option<String>);

impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AccessToken(extract_bearer_token(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_bearer_header() {
        let map = headers(&[("authorization", "Bearer abc.def")]);
        assert_eq!(extract_bearer_token(&map).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_cookie_fallback() {
        let map = headers(&[("cookie", "theme=dark; sb-access-token=tok123; other=1")]);
        assert_eq!(extract_bearer_token(&map).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "sb-access-token=from-cookie"),
        ]);
        assert_eq!(extract_bearer_token(&map).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_non_bearer_and_lookalike_cookies_ignored() {
        let map = headers(&[
            ("authorization", "Basic dXNlcjpwYXNz"),
            ("cookie", "sb-access-token-old=stale; sb-access-token="),
        ]);
        assert_eq!(extract_bearer_token(&map), None);
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
