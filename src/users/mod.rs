mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::{PgUserStore, UserStore};
pub use repo_types::{NewUser, User, UserPage, UserUpdate};

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
