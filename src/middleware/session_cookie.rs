//! Session cookie: carries the session correlation id between browser and gateway.
//!
//! Parsing and building go through the `cookie` crate. Bearer requests never read or set it.
use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, CookieJar, SameSite};

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::session::SessionId;

#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub ttl_seconds: u64,
    pub secure: bool,
}

impl SessionCookie {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.session_cookie_name.clone(),
            ttl_seconds: config.session_ttl_seconds,
            secure: config.app_env.is_production(),
        }
    }

    /// Session id presented by the client, if any.
    pub fn presented(&self, headers: &HeaderMap) -> Option<SessionId> {
        parse_cookies(headers)
            .get(&self.name)
            .map(|c| c.value().trim())
            .filter(|v| !v.is_empty())
            .map(SessionId::new)
    }

    pub fn header_value(&self, session_id: &SessionId) -> Result<HeaderValue, AppError> {
        let max_age = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        self.build(session_id.as_str().to_string(), max_age)
    }

    pub fn clear_header_value(&self) -> Result<HeaderValue, AppError> {
        self.build(String::new(), 0)
    }

    fn build(&self, value: String, max_age_seconds: i64) -> Result<HeaderValue, AppError> {
        let cookie = Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(max_age_seconds))
            .build();

        HeaderValue::from_str(&cookie.to_string()).map_err(|err| {
            tracing::error!(error = %err, "session cookie is not a valid header value");
            AppError::Internal
        })
    }
}

// Later headers override earlier ones for the same cookie name; unparsable chunks are skipped.
fn parse_cookies(headers: &HeaderMap) -> CookieJar {
    let mut cookies = CookieJar::new();
    for header in headers.get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for chunk in raw.split(';').map(str::trim) {
            if let Ok(cookie) = Cookie::parse(chunk) {
                cookies.add_original(cookie.into_owned());
            }
        }
    }
    cookies
}
