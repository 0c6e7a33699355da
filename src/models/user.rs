use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// A local account as stored in the `users` table.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}
