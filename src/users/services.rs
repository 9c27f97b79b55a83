use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::{AppError, AppResult},
    pagination::PaginationParams,
    users::{
        repo::UserStore,
        repo_types::{NewUser, User, UserPage, UserUpdate},
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_profile(name: &str, email: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Validation("Name is required.".into()));
    }
    if email.is_empty() {
        return Err(AppError::Validation("Email is required.".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email.".into()));
    }
    Ok(())
}

/// Checks `password` against the stored hash of the user registered under `email`.
///
/// Unknown emails fail with `NotFound` and wrong passwords with
/// `InvalidCredentials`; handlers collapse both into one user-facing message.
pub async fn authenticate(store: &dyn UserStore, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);
    let creds = store.credentials_by_email(&email).await?;

    let ok = verify_password(password, &creds.password_hash).unwrap_or_else(|e| {
        warn!(error = %e, user_id = creds.user.id, "stored password hash is unreadable");
        false
    });
    if !ok {
        return Err(AppError::InvalidCredentials);
    }
    debug!(user_id = creds.user.id, "credentials verified");
    Ok(creds.user)
}

pub async fn create_user(store: &dyn UserStore, new: NewUser) -> AppResult<User> {
    let email = normalize_email(&new.email);
    let name = new.name.trim();
    validate_profile(name, &email)?;
    if new.password.is_empty() {
        return Err(AppError::Validation("Password is required.".into()));
    }
    if new.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    let hash = hash_password(&new.password)?;
    let user = store.insert(&email, name, &hash).await?;
    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn list_users(
    store: &dyn UserStore,
    name_filter: &str,
    params: PaginationParams,
) -> AppResult<UserPage> {
    store.list(name_filter.trim(), params.normalized()).await
}

pub async fn get_user(store: &dyn UserStore, id: i64) -> AppResult<User> {
    store.get(id).await
}

pub async fn update_user(store: &dyn UserStore, update: UserUpdate) -> AppResult<User> {
    let email = normalize_email(&update.email);
    let name = update.name.trim();
    validate_profile(name, &email)?;

    let user = store.update(update.id, name, &email).await?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, id: i64) -> AppResult<()> {
    store.delete(id).await?;
    info!(user_id = id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn new_user(email: &str, name: &str, password: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: name.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Admin@Gmail.COM "), "admin@gmail.com");
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("staff@gmail.com"));
        assert!(!is_valid_email("Sudarmono"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[tokio::test]
    async fn create_then_authenticate_returns_lowercased_email() {
        let store = MemoryStore::new();
        let created = create_user(&store, new_user("Sudarmaji@Gmail.com", "Sudarmaji", "password321"))
            .await
            .expect("create");
        assert!(created.id > 0);
        assert_eq!(created.email, "sudarmaji@gmail.com");

        let authed = authenticate(&store, "SUDARMAJI@gmail.com", "password321")
            .await
            .expect("authenticate");
        assert_eq!(authed.id, created.id);
        assert_eq!(authed.email, "sudarmaji@gmail.com");
    }

    #[tokio::test]
    async fn authenticate_distinguishes_unknown_email_and_wrong_password() {
        let store = MemoryStore::new();
        create_user(&store, new_user("admin@gmail.com", "admin", "password123"))
            .await
            .unwrap();

        let err = authenticate(&store, "admin@gmail.com", "nope-nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = authenticate(&store, "admin1@gmail.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_and_duplicates() {
        let store = MemoryStore::new();
        let err = create_user(&store, new_user("", "x", "password123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = create_user(&store, new_user("a@b.co", "  ", "password123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = create_user(&store, new_user("a@b.co", "a", "short")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        create_user(&store, new_user("a@b.co", "a", "password123")).await.unwrap();
        let err = create_user(&store, new_user("A@B.CO", "b", "password123")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_changes_profile_but_not_password() {
        let store = MemoryStore::new();
        let user = create_user(&store, new_user("staff@gmail.com", "staff", "password123"))
            .await
            .unwrap();

        let updated = update_user(
            &store,
            UserUpdate {
                id: user.id,
                name: "staff khusus".into(),
                email: "Staff@Gmail.com".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "staff khusus");
        assert_eq!(updated.email, "staff@gmail.com");
        assert!(updated.updated_at >= user.updated_at);

        authenticate(&store, "staff@gmail.com", "password123").await.unwrap();

        let err = update_user(
            &store,
            UserUpdate {
                id: 999,
                name: "ghost".into(),
                email: "ghost@gmail.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_not_silent_on_missing_rows() {
        let store = MemoryStore::new();
        let user = create_user(&store, new_user("gone@gmail.com", "gone", "password123"))
            .await
            .unwrap();

        delete_user(&store, user.id).await.unwrap();
        assert!(matches!(get_user(&store, user.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(delete_user(&store, user.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_filters_case_insensitively_and_pages() {
        let store = MemoryStore::new();
        for (email, name) in [
            ("admin@gmail.com", "admin"),
            ("manager@gmail.com", "manager"),
            ("staff@gmail.com", "staff"),
            ("sudarmaji@gmail.com", "Sudarmaji"),
        ] {
            create_user(&store, new_user(email, name, "password123")).await.unwrap();
        }

        let page = list_users(&store, "darma", PaginationParams::default()).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Sudarmaji");
        assert_eq!(page.pagination.rows, 1);

        let page = list_users(&store, "", PaginationParams::new(1, 3)).await.unwrap();
        assert_eq!(page.pagination.rows, 4);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(page.data.len(), 3);
        assert!(page.data.windows(2).all(|w| w[0].id < w[1].id));

        let page = list_users(&store, "", PaginationParams::new(2, 3)).await.unwrap();
        assert_eq!(page.data.len(), 1);

        let page = list_users(&store, "", PaginationParams::new(9, 3)).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.pages, 2);
    }
}
