pub mod extractors;
pub mod local;
pub mod middleware;
pub mod password;
pub mod provider;
pub mod session;
pub mod strategy;

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppError;

pub use extractors::CurrentIdentity;
pub use local::LocalAuthenticator;
pub use middleware::{RequireIdentity, SessionMiddleware};
pub use password::{hash_password, verify_password};
pub use provider::{
    IdentityProvider, JwtIdentityProvider, ProviderClaims, ProviderCredentials, ProviderWebConfig,
};
pub use session::{Identity, SessionKeys, SESSION_COOKIE};
pub use strategy::AuthStrategy;

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Which authentication strategy a deployment runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Every visitor shares one hardcoded identity.
    Anonymous,
    /// Identity comes from a verified external-provider ID token.
    Token,
    /// Local username/password accounts.
    Local,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" | "none" => Ok(AuthMode::Anonymous),
            "token" | "external" => Ok(AuthMode::Token),
            "local" => Ok(AuthMode::Local),
            other => Err(format!("unknown auth mode '{}'", other)),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AuthMode::Anonymous => "anonymous",
            AuthMode::Token => "token",
            AuthMode::Local => "local",
        };
        f.write_str(name)
    }
}

/// Form posted to `/login`.
///
/// Missing fields become empty strings and fail like any wrong credential.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Form posted to `/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    /// 3 to 32 characters: letters, digits, underscores or hyphens.
    #[serde(default)]
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    /// At most 72 bytes: bcrypt ignores anything beyond that.
    #[serde(default)]
    #[validate(length(min = 1), custom = "fits_bcrypt")]
    pub password: String,
}

/// Longest password bcrypt hashes in full.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("password_too_long"));
    }
    Ok(())
}

impl SignupForm {
    /// Validates the form, turning failures into a message fit for the page.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|errors| AppError::BadRequest(describe(&errors)))
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
    fields.sort_unstable();
    format!("Please check: {}", fields.join(", "))
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
