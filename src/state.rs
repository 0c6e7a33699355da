use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::auth::{
    AuthMode, AuthStrategy, JwtIdentityProvider, LocalAuthenticator, ProviderCredentials,
    SessionKeys,
};
use crate::config::Config;
use crate::error::AppError;
use crate::notify::{LogMailer, Mailer, Notifier, SmtpMailer};
use crate::store::{TodoStore, UserStore};

/// Everything a handler needs, built once at startup and shared through
/// `web::Data<AppState>`.
pub struct AppState {
    pub todos: TodoStore,
    pub sessions: SessionKeys,
    pub strategy: AuthStrategy,
    pub notifier: Notifier,
}

impl AppState {
    pub fn from_config(config: &Config, pool: SqlitePool) -> Result<Self, AppError> {
        let users = UserStore::new(pool.clone());

        let strategy = match config.auth_mode {
            AuthMode::Anonymous => {
                log::warn!("Authentication disabled: all visitors share one todo list");
                AuthStrategy::Anonymous
            }
            AuthMode::Token => {
                let path = config.provider_credentials.as_deref().ok_or_else(|| {
                    AppError::InternalServerError("IDENTITY_PROVIDER_CREDENTIALS not set".into())
                })?;
                let credentials = ProviderCredentials::from_file(path)?;
                let provider =
                    JwtIdentityProvider::new(&credentials, config.token_clock_skew_secs)?;
                AuthStrategy::ExternalToken(Arc::new(provider))
            }
            AuthMode::Local => {
                AuthStrategy::Local(LocalAuthenticator::new(users.clone(), config.bcrypt_cost)?)
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.mail {
            Some(mail) => Arc::new(SmtpMailer::new(mail).map_err(|e| {
                AppError::InternalServerError(format!("Invalid mail configuration: {}", e))
            })?),
            None => {
                log::warn!("MAIL_SERVER not set; notifications will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            todos: TodoStore::new(pool),
            sessions: SessionKeys::new(
                config.secret_key.as_bytes(),
                config.session_ttl_secs,
                config.session_cookie_secure,
            ),
            strategy,
            notifier: Notifier::new(
                mailer,
                users,
                config.anonymous_email.clone(),
                Duration::from_secs(config.mail_timeout_secs),
            ),
        })
    }
}
