use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::User;

pub const ALREADY_REGISTERED: &str = "Username or email already registered";

/// Credential store for the local strategy.
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a user whose password has already been hashed.
    ///
    /// Username and email are compared exactly as stored (case-sensitive).
    /// The unique constraints back up the pre-check when two signups race.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let existing = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM users WHERE username = ? OR email = ?",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(AppError::BadRequest(ALREADY_REGISTERED.into()));
        }

        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::BadRequest(ALREADY_REGISTERED.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// The registered email address for a user id, if the user exists.
    pub async fn email_for(&self, user_id: i64) -> Result<Option<String>, AppError> {
        let email = sqlx::query_as::<_, (String,)>("SELECT email FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(email.map(|(email,)| email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> UserStore {
        UserStore::new(db::connect_in_memory().await.unwrap())
    }

    #[actix_rt::test]
    async fn test_create_and_find() {
        let store = store().await;
        let user = store.create("alice", "a@x.com", "hash").await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_duplicate_username_or_email_rejected() {
        let store = store().await;
        store.create("alice", "a@x.com", "hash").await.unwrap();

        for (username, email) in [("alice", "other@x.com"), ("alicia", "a@x.com")] {
            match store.create(username, email, "hash").await {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, ALREADY_REGISTERED),
                other => panic!("expected duplicate rejection, got {:?}", other),
            }
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_rt::test]
    async fn test_uniqueness_is_case_sensitive() {
        let store = store().await;
        store.create("alice", "a@x.com", "hash").await.unwrap();

        assert!(store.create("Alice", "A@x.com", "hash").await.is_ok());
    }

    #[actix_rt::test]
    async fn test_email_for() {
        let store = store().await;
        let user = store.create("alice", "a@x.com", "hash").await.unwrap();

        assert_eq!(
            store.email_for(user.id).await.unwrap().as_deref(),
            Some("a@x.com")
        );
        assert!(store.email_for(user.id + 1).await.unwrap().is_none());
    }
}
