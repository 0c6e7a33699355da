use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "session";

/// Longest session lifetime accepted from configuration (one year).
pub const MAX_SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 365;

/// Owner key shared by every visitor when no authentication is configured.
pub const ANONYMOUS_OWNER: &str = "default_user";

/// The principal that owns todos within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    /// The single shared identity used when authentication is disabled.
    Anonymous,
    /// A subject verified by the external identity provider.
    External { uid: String, email: Option<String> },
    /// A local account, by primary key.
    Local { user_id: i64 },
}

impl Identity {
    /// The value stored in `todos.owner_id` for this identity.
    pub fn owner_key(&self) -> String {
        match self {
            Identity::Anonymous => ANONYMOUS_OWNER.to_string(),
            Identity::External { uid, .. } => uid.clone(),
            Identity::Local { user_id } => user_id.to_string(),
        }
    }
}

/// Claims of the session token stored in the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub identity: Identity,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

/// Signs and verifies session cookies with the application secret.
///
/// A session is an HS256 token with a fixed lifetime. Re-issuing it on every
/// authenticated request gives the sliding expiration.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure: bool,
}

impl SessionKeys {
    /// `ttl_secs` is clamped to `1..=MAX_SESSION_TTL_SECS`.
    pub fn new(secret: &[u8], ttl_secs: i64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs.clamp(1, MAX_SESSION_TTL_SECS)),
            secure,
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("Session expiry out of range".into()))?;
        let claims = SessionClaims {
            identity: identity.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to sign session: {}", e)))
    }

    /// Returns the claims of a well-formed, correctly signed, unexpired
    /// session token. Anything else is treated as no session at all.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                log::debug!("Ignoring session cookie: {}", e);
                None
            }
        }
    }

    /// A fresh session cookie for `identity`.
    pub fn cookie(&self, identity: &Identity) -> Result<Cookie<'static>, AppError> {
        let token = self.issue(identity)?;
        Ok(Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.ttl.num_seconds()))
            .finish())
    }

    /// A cookie that makes the browser drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .finish();
        cookie.make_removal();
        cookie
    }
}
