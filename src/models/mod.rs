pub mod todo;
pub mod user;

pub use todo::{Todo, TodoForm, TodoInput};
pub use user::User;
