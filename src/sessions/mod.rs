pub mod repo;
pub mod repo_types;
pub mod token;

pub use repo::{PgSessionStore, SessionStore};
pub use repo_types::Session;
