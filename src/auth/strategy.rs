use std::sync::Arc;

use actix_web::{http::header, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::local::LocalAuthenticator;
use crate::auth::provider::IdentityProvider;
use crate::auth::session::{Identity, SessionKeys, SESSION_COOKIE};
use crate::auth::AuthMode;

/// Where unauthenticated browsers are sent.
pub const LOGIN_PATH: &str = "/login";

/// The authentication strategy chosen at startup.
///
/// All strategies answer the same question through `resolve_identity`, which
/// is what the session middleware and the route guard rely on.
#[derive(Clone)]
pub enum AuthStrategy {
    Anonymous,
    ExternalToken(Arc<dyn IdentityProvider>),
    Local(LocalAuthenticator),
}

impl AuthStrategy {
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthStrategy::Anonymous => AuthMode::Anonymous,
            AuthStrategy::ExternalToken(_) => AuthMode::Token,
            AuthStrategy::Local(_) => AuthMode::Local,
        }
    }

    /// Whether identities live in the session cookie.
    pub fn uses_session(&self) -> bool {
        !matches!(self, AuthStrategy::Anonymous)
    }

    /// The identity active for `req`, if any.
    ///
    /// A session minted under one strategy is ignored by the others.
    pub fn resolve_identity(&self, req: &HttpRequest, sessions: &SessionKeys) -> Option<Identity> {
        if let AuthStrategy::Anonymous = self {
            return Some(Identity::Anonymous);
        }

        let cookie = req.cookie(SESSION_COOKIE)?;
        let identity = sessions.decode(cookie.value())?.identity;
        match (self, &identity) {
            (AuthStrategy::ExternalToken(_), Identity::External { .. })
            | (AuthStrategy::Local(_), Identity::Local { .. }) => Some(identity),
            _ => None,
        }
    }

    /// Response for a guarded request without an identity: browsers are sent
    /// to the login page, token clients get a bare 401.
    pub fn reject(&self) -> HttpResponse {
        match self {
            AuthStrategy::ExternalToken(_) => {
                HttpResponse::Unauthorized().json(json!({ "error": "Authentication required" }))
            }
            AuthStrategy::Anonymous | AuthStrategy::Local(_) => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, LOGIN_PATH))
                .finish(),
        }
    }
}
