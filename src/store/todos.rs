use sqlx::SqlitePool;
use validator::Validate;

use crate::error::AppError;
use crate::models::{Todo, TodoInput};

pub const INVALID_TODO: &str = "Invalid todo";
pub const TODO_NOT_FOUND: &str = "Todo not found";

/// Owner-scoped access to the `todos` table.
///
/// Every statement filters on `owner_id`, so a todo belonging to another
/// identity is indistinguishable from one that never existed.
#[derive(Debug, Clone)]
pub struct TodoStore {
    pool: SqlitePool,
}

impl TodoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Round-trips a trivial query, for health checks.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// All todos of `owner`, in creation order.
    pub async fn list(&self, owner: &str) -> Result<Vec<Todo>, AppError> {
        let todos = sqlx::query_as::<_, Todo>(
            "SELECT id, owner_id, title, completed FROM todos WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    /// Persists a new, not yet completed todo for `owner`.
    ///
    /// Returns `BadRequest` without touching the table when the title is
    /// empty, whitespace-only or longer than 200 characters.
    pub async fn create(&self, owner: &str, input: TodoInput) -> Result<Todo, AppError> {
        input
            .validate()
            .map_err(|_| AppError::BadRequest(INVALID_TODO.into()))?;

        let todo = sqlx::query_as::<_, Todo>(
            "INSERT INTO todos (owner_id, title, completed) VALUES (?, ?, 0)
             RETURNING id, owner_id, title, completed",
        )
        .bind(owner)
        .bind(&input.title)
        .fetch_one(&self.pool)
        .await?;
        Ok(todo)
    }

    /// Flips `completed` in a single statement and returns the updated row.
    pub async fn toggle(&self, owner: &str, id: i64) -> Result<Todo, AppError> {
        sqlx::query_as::<_, Todo>(
            "UPDATE todos SET completed = NOT completed
             WHERE id = ? AND owner_id = ?
             RETURNING id, owner_id, title, completed",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(TODO_NOT_FOUND.into()))
    }

    pub async fn delete(&self, owner: &str, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(TODO_NOT_FOUND.into()));
        }
        Ok(())
    }
}
