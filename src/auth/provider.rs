//! Verification of ID tokens minted by an external identity provider.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest clock skew tolerated on provider timestamps (one hour).
pub const MAX_CLOCK_SKEW_SECS: u64 = 60 * 60;

/// The one message returned for every kind of token rejection.
pub const INVALID_TOKEN: &str = "Invalid token";

/// Claims the application relies on from a provider ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderClaims {
    /// The provider's stable user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Something that can turn a bearer token into verified claims.
pub trait IdentityProvider: Send + Sync {
    /// Verifies signature, expiry and revocation. Every failure is reported
    /// as `AppError::Unauthorized` with the same message.
    fn verify_id_token(&self, token: &str) -> Result<ProviderClaims, AppError>;

    /// Client settings the browser needs to sign in with the provider, if any.
    fn web_config(&self) -> Option<&ProviderWebConfig> {
        None
    }
}

/// Browser-side settings of the provider's client SDK, served to the login
/// page as `/provider-config.js`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderWebConfig {
    pub api_key: String,
    pub auth_domain: String,
    /// Filled from the credential's `project_id` when left out.
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

/// Contents of the service credential file named by
/// `IDENTITY_PROVIDER_CREDENTIALS`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCredentials {
    pub project_id: String,
    /// Defaults to `https://securetoken.google.com/<project_id>`.
    #[serde(default)]
    pub issuer: Option<String>,
    /// RSA public key (PEM) for tokens without a known `kid`.
    #[serde(default)]
    pub public_key_pem: Option<String>,
    /// RSA public keys (PEM) by key id, for providers that rotate keys.
    #[serde(default)]
    pub public_keys: HashMap<String, String>,
    /// Revocations exported by the provider: tokens issued to a subject
    /// before the given instant (seconds since epoch) are rejected.
    #[serde(default)]
    pub tokens_valid_after: HashMap<String, i64>,
    #[serde(default)]
    pub web: Option<ProviderWebConfig>,
}

impl ProviderCredentials {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InternalServerError(format!(
                "Cannot read provider credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::InternalServerError(format!(
                "Malformed provider credentials {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn issuer(&self) -> String {
        self.issuer
            .clone()
            .unwrap_or_else(|| format!("https://securetoken.google.com/{}", self.project_id))
    }
}

fn rsa_key(pem: &str) -> Result<DecodingKey, AppError> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| AppError::InternalServerError(format!("Invalid provider public key: {}", e)))
}

/// RS256 verifier for provider ID tokens with per-subject revocation.
pub struct JwtIdentityProvider {
    default_key: Option<DecodingKey>,
    keys: HashMap<String, DecodingKey>,
    validation: Validation,
    leeway: i64,
    /// Tokens issued before this instant (seconds since epoch) are revoked.
    valid_after: RwLock<HashMap<String, i64>>,
    web: Option<ProviderWebConfig>,
}

impl JwtIdentityProvider {
    /// Builds the verifier from the credential file, seeding the revocation
    /// table from `tokens_valid_after`. The skew is capped at
    /// `MAX_CLOCK_SKEW_SECS`.
    pub fn new(credentials: &ProviderCredentials, clock_skew_secs: u64) -> Result<Self, AppError> {
        let clock_skew_secs = clock_skew_secs.min(MAX_CLOCK_SKEW_SECS);
        let default_key = credentials.public_key_pem.as_deref().map(rsa_key).transpose()?;
        let keys = credentials
            .public_keys
            .iter()
            .map(|(kid, pem)| Ok((kid.clone(), rsa_key(pem)?)))
            .collect::<Result<HashMap<_, _>, AppError>>()?;
        if default_key.is_none() && keys.is_empty() {
            return Err(AppError::InternalServerError(
                "Provider credentials contain no public key".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = clock_skew_secs;
        validation.set_audience(&[credentials.project_id.as_str()]);
        validation.set_issuer(&[credentials.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);

        let web = credentials.web.clone().map(|mut web| {
            if web.project_id.is_empty() {
                web.project_id = credentials.project_id.clone();
            }
            web
        });

        if !credentials.tokens_valid_after.is_empty() {
            log::info!(
                "Loaded {} provider token revocation(s)",
                credentials.tokens_valid_after.len()
            );
        }

        Ok(Self {
            default_key,
            keys,
            validation,
            leeway: i64::try_from(clock_skew_secs).unwrap_or_default(),
            valid_after: RwLock::new(credentials.tokens_valid_after.clone()),
            web,
        })
    }

    /// Revokes every token issued to `uid` up to now.
    pub fn revoke_tokens(&self, uid: &str) {
        self.valid_after
            .write()
            .insert(uid.to_string(), Utc::now().timestamp());
        log::info!("Revoked provider tokens for {}", uid);
    }

    fn is_revoked(&self, claims: &ProviderClaims) -> bool {
        self.valid_after
            .read()
            .get(&claims.sub)
            .is_some_and(|after| claims.iat < *after)
    }

    /// The key named by the token's `kid`, else the default key.
    fn key_for(&self, token: &str) -> Result<&DecodingKey, AppError> {
        let header = decode_header(token)?;
        header
            .kid
            .as_ref()
            .and_then(|kid| self.keys.get(kid))
            .or(self.default_key.as_ref())
            .ok_or_else(|| {
                log::debug!("Token rejected: unknown key id {:?}", header.kid);
                AppError::Unauthorized(INVALID_TOKEN.into())
            })
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify_id_token(&self, token: &str) -> Result<ProviderClaims, AppError> {
        let key = self.key_for(token)?;
        let claims = decode::<ProviderClaims>(token, key, &self.validation)?.claims;

        if claims.sub.is_empty() {
            log::debug!("Token rejected: empty subject");
            return Err(AppError::Unauthorized(INVALID_TOKEN.into()));
        }
        if claims.iat > Utc::now().timestamp().saturating_add(self.leeway) {
            log::debug!("Token rejected: issued in the future");
            return Err(AppError::Unauthorized(INVALID_TOKEN.into()));
        }
        if self.is_revoked(&claims) {
            log::debug!("Token rejected: revoked for {}", claims.sub);
            return Err(AppError::Unauthorized(INVALID_TOKEN.into()));
        }
        Ok(claims)
    }

    fn web_config(&self) -> Option<&ProviderWebConfig> {
        self.web.as_ref()
    }
}
