use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::pagination::{PaginationParams, PaginationResult};

/// User record as exposed to handlers. The password hash lives in
/// [`UserCredentials`] and never leaves the store layer otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String, // always lowercase
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// User row together with its stored Argon2 hash, used for sign-in only.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Input for creating a user; `password` is plaintext until hashed by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

/// Input for updating name and email. The password is not changed on this path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// One page of users plus the totals of the whole filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub data: Vec<User>,
    pub pagination: PaginationResult,
    pub params: PaginationParams,
}
