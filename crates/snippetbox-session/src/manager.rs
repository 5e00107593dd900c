//! Loading sessions from requests and saving them to responses.

use std::time::Duration;

use chrono::Utc;
use http::HeaderMap;

use crate::codec::{Payload, SessionCodec};
use crate::cookie::{Cookies, SameSite, SetCookie};
use crate::error::SessionError;
use crate::session::{Session, Status};

/// Session cookie settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// HMAC signing secret
    pub secret: String,
    /// Absolute lifetime of a session from its first write
    pub lifetime: Duration,
    /// Cookie name
    pub cookie_name: String,
    /// Whether the cookie carries the `Secure` flag
    pub secure: bool,
}

impl SessionConfig {
    /// Settings with the given secret and the default 12 hour lifetime.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime: Duration::from_secs(12 * 60 * 60),
            cookie_name: "session".to_string(),
            secure: true,
        }
    }

    /// Overrides the lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Overrides the cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Overrides the `Secure` flag.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// Decodes sessions from request cookies and encodes them back.
#[derive(Debug, Clone)]
pub struct SessionManager {
    codec: SessionCodec,
    lifetime_secs: i64,
    cookie_name: String,
    secure: bool,
}

impl SessionManager {
    /// Builds a manager. Fails if the secret is too short.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        Ok(Self {
            codec: SessionCodec::new(config.secret.as_bytes())?,
            lifetime_secs: i64::try_from(config.lifetime.as_secs()).unwrap_or(i64::MAX),
            cookie_name: config.cookie_name,
            secure: config.secure,
        })
    }

    /// Name of the session cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Reads the session cookie from `headers`.
    #[must_use]
    pub fn load(&self, headers: &HeaderMap) -> Session {
        self.load_at(headers, Utc::now().timestamp())
    }

    /// Reads the session cookie as of `now` (unix seconds).
    #[must_use]
    pub fn load_at(&self, headers: &HeaderMap, now: i64) -> Session {
        let cookies = Cookies::from_headers(headers);
        let Some(raw) = cookies.get(&self.cookie_name) else {
            return Session::new();
        };
        match self.codec.decode(raw, now) {
            Some(payload) => Session::restore(payload.values, payload.deadline),
            None => {
                tracing::debug!(cookie = %self.cookie_name, "discarding invalid or expired session cookie");
                Session::new()
            }
        }
    }

    /// Returns the cookie to send back, if the session changed.
    pub fn save(&self, session: &mut Session) -> Result<Option<SetCookie>, SessionError> {
        self.save_at(session, Utc::now().timestamp())
    }

    /// Like [`save`](Self::save) with an explicit clock.
    pub fn save_at(
        &self,
        session: &mut Session,
        now: i64,
    ) -> Result<Option<SetCookie>, SessionError> {
        match session.status() {
            Status::Unmodified => Ok(None),
            Status::Destroyed => Ok(Some(self.base_cookie(SetCookie::remove(&self.cookie_name)))),
            Status::Modified => {
                let deadline = session.ensure_deadline(now.saturating_add(self.lifetime_secs));
                let payload = Payload {
                    deadline,
                    values: session.values().clone(),
                };
                let value = self.codec.encode(&payload)?;
                let remaining = u64::try_from(deadline.saturating_sub(now)).unwrap_or(0);
                Ok(Some(self.base_cookie(
                    SetCookie::new(&self.cookie_name, value).max_age_secs(remaining),
                )))
            }
        }
    }

    fn base_cookie(&self, cookie: SetCookie) -> SetCookie {
        cookie
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
    }
}
