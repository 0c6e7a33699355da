#![doc = "The `tickbox` library crate."]
#![doc = ""]
#![doc = "A personal to-do list served as HTML pages. Authentication is pluggable:"]
#![doc = "anonymous, external identity-provider tokens, or local accounts, chosen at"]
#![doc = "startup. The binary (`main.rs`) builds an `AppState` from `Config` and"]
#![doc = "mounts `routes::config` behind `auth::SessionMiddleware`."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod views;

pub use crate::error::AppError;
pub use crate::state::AppState;
