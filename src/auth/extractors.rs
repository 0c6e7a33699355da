use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};

use crate::auth::session::Identity;
use crate::error::AppError;

/// Extracts the identity resolved by `SessionMiddleware`.
///
/// Guarded routes always have one; elsewhere use `Option<CurrentIdentity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentIdentity(pub Identity);

impl Deref for CurrentIdentity {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

impl FromRequest for CurrentIdentity {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>().cloned() {
            Some(identity) => ready(Ok(CurrentIdentity(identity))),
            None => {
                let err = AppError::Unauthorized("Authentication required".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
