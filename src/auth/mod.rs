use crate::state::AppState;
use axum::Router;

pub mod cookie;
mod dto;
pub mod handlers;
pub mod middleware;
pub mod password;

pub use middleware::{require_user, set_current_user, CurrentUser};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
