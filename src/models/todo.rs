use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents a todo as stored in the `todos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    /// Server-assigned identifier.
    pub id: i64,
    /// Owner key of the identity that created the todo.
    pub owner_id: String,
    /// Title, trimmed, between 1 and 200 characters.
    pub title: String,
    /// Whether the todo has been checked off. New todos start as `false`.
    pub completed: bool,
}

/// Raw form payload posted to `/add_todo`.
///
/// A missing `title` field deserializes to an empty string so it is rejected
/// by validation rather than by the extractor.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub title: String,
}

/// Normalized input for creating a todo.
#[derive(Debug, Validate)]
pub struct TodoInput {
    /// The title after surrounding whitespace has been stripped.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

impl From<TodoForm> for TodoInput {
    fn from(form: TodoForm) -> Self {
        Self {
            title: form.title.trim().to_string(),
        }
    }
}
