pub mod app;
pub mod auth;
pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod memory;
pub mod pagination;
pub mod response;
pub mod seed;
pub mod sessions;
pub mod state;
pub mod users;

pub use error::{AppError, AppResult};
