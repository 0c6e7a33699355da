//! Persistence for todos and local accounts.

pub mod todos;
pub mod users;

pub use todos::TodoStore;
pub use users::UserStore;
