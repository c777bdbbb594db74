// Session cookie construction

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};

use crate::auth::error::AuthError;

pub const SESSION_COOKIE_NAME: &str = "token";
/// Value written on logout so clients drop the real token
pub const LOGOUT_SENTINEL: &str = "none";
pub const LOGOUT_COOKIE_TTL_SECONDS: i64 = 10;

/// A `Set-Cookie` value for the session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    value: String,
    expires: DateTime<Utc>,
    secure: bool,
}

impl SessionCookie {
    /// Cookie carrying a freshly issued token
    pub fn session(token: &str, expires: DateTime<Utc>, secure: bool) -> Self {
        Self {
            value: token.to_string(),
            expires,
            secure,
        }
    }

    /// Sentinel cookie that overwrites the token and expires almost immediately
    pub fn cleared(now: DateTime<Utc>, secure: bool) -> Self {
        Self {
            value: LOGOUT_SENTINEL.to_string(),
            expires: now + Duration::seconds(LOGOUT_COOKIE_TTL_SECONDS),
            secure,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> Result<HeaderValue, AuthError> {
        let expires = self.expires.format("%a, %d %b %Y %H:%M:%S GMT");
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={}; Path=/; Expires={expires}; HttpOnly",
            self.value
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|e| AuthError::HeaderError(e.to_string()))
    }
}

/// Read the session token from the `Cookie` header, ignoring the logout sentinel
pub fn session_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim().to_string())
        })
        .find(|token| !token.is_empty() && token != LOGOUT_SENTINEL)
}
