//! Session persistence adapter.
//!
//! The hosted auth service issues an access/refresh token pair; the portal
//! keeps both in cookies. The pair is always written and cleared together so
//! that a half-present session can never be observed.

pub mod pkce;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::fmt;
use time::{Duration, OffsetDateTime};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Holds the code verifier between sign-up and the confirmation callback.
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

/// One year.
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;

/// Confirmation links expire after an hour.
pub const CODE_VERIFIER_MAX_AGE_SECS: i64 = 60 * 60;

/// Access/refresh token pair. Both values are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionTokens {
    /// Returns `None` unless both tokens are present and non-empty.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        if access_token.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token,
        })
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

/// Reads and writes the session cookie pair.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookies {
    secure: bool,
}

impl SessionCookies {
    /// `secure` should be true in production (HTTPS only cookies).
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn read(&self, jar: &CookieJar) -> Option<SessionTokens> {
        let access_token = jar.get(ACCESS_TOKEN_COOKIE)?.value().to_owned();
        let refresh_token = jar.get(REFRESH_TOKEN_COOKIE)?.value().to_owned();
        SessionTokens::new(access_token, refresh_token)
    }

    pub fn persist(&self, jar: CookieJar, tokens: &SessionTokens) -> CookieJar {
        let max_age = Duration::seconds(SESSION_COOKIE_MAX_AGE_SECS);
        jar.add(self.cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), max_age))
            .add(self.cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), max_age))
    }

    /// Expire both cookies, whether or not the request carried them.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.expired(ACCESS_TOKEN_COOKIE))
            .add(self.expired(REFRESH_TOKEN_COOKIE))
    }

    pub fn read_verifier(&self, jar: &CookieJar) -> Option<String> {
        jar.get(CODE_VERIFIER_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn persist_verifier(&self, jar: CookieJar, verifier: &str) -> CookieJar {
        jar.add(self.cookie(
            CODE_VERIFIER_COOKIE,
            verifier.to_owned(),
            Duration::seconds(CODE_VERIFIER_MAX_AGE_SECS),
        ))
    }

    /// The verifier is single use.
    pub fn clear_verifier(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.expired(CODE_VERIFIER_COOKIE))
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .max_age(max_age)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .http_only(true)
            .build()
    }

    fn expired(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, String::new(), Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }
}
