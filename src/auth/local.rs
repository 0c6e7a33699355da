use crate::auth::password::{hash_password, hash_password_blocking, verify_password_blocking};
use crate::auth::{LoginForm, SignupForm};
use crate::error::AppError;
use crate::models::User;
use crate::store::UserStore;

/// The single message for every failed login.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Username/password accounts backed by the credential store.
#[derive(Debug, Clone)]
pub struct LocalAuthenticator {
    users: UserStore,
    cost: u32,
    /// Verified against when the username is unknown, so both failure paths
    /// do the same bcrypt work.
    dummy_hash: String,
}

impl LocalAuthenticator {
    pub fn new(users: UserStore, cost: u32) -> Result<Self, AppError> {
        let dummy_hash = hash_password("tickbox-unknown-user", cost)?;
        Ok(Self {
            users,
            cost,
            dummy_hash,
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Validates the form, hashes the password and stores the account.
    pub async fn signup(&self, form: SignupForm) -> Result<User, AppError> {
        form.check()?;
        let password_hash = hash_password_blocking(form.password, self.cost).await?;
        self.users
            .create(&form.username, &form.email, &password_hash)
            .await
    }

    /// Returns the user when the credentials match, `Unauthorized` with
    /// `INVALID_CREDENTIALS` otherwise.
    pub async fn login(&self, form: LoginForm) -> Result<User, AppError> {
        let user = self.users.find_by_username(&form.username).await?;
        let stored_hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());

        let matches = verify_password_blocking(form.password, stored_hash).await?;
        match user {
            Some(user) if matches => Ok(user),
            _ => Err(AppError::Unauthorized(INVALID_CREDENTIALS.into())),
        }
    }
}
