use tracing::info;

use crate::{
    error::AppResult,
    users::{services::create_user, NewUser, UserStore},
};

pub const SEED_PASSWORD: &str = "password123";

/// Default accounts as `(email, name)`.
pub const SEED_USERS: [(&str, &str); 3] = [
    ("admin@gmail.com", "admin"),
    ("manager@gmail.com", "manager"),
    ("staff@gmail.com", "staff"),
];

/// Inserts the default accounts when the users table is empty. Returns how
/// many users were created.
pub async fn seed_users(store: &dyn UserStore) -> AppResult<usize> {
    let existing = store.count().await?;
    if existing > 0 {
        info!(existing, "users already seeded");
        return Ok(0);
    }

    for (email, name) in SEED_USERS {
        create_user(
            store,
            NewUser {
                email: email.into(),
                name: name.into(),
                password: SEED_PASSWORD.into(),
            },
        )
        .await?;
    }
    info!(count = SEED_USERS.len(), "users seeded");
    Ok(SEED_USERS.len())
}
