//! In-process implementation of [`UserStore`] and [`SessionStore`].
//!
//! Mirrors the Postgres semantics closely enough for router tests and local runs
//! without a database: ids ascend from 1, email uniqueness is enforced, listing
//! orders by id, and deleting a user drops their sessions.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::{
    error::{AppError, AppResult},
    pagination::{PaginationParams, PaginationResult},
    sessions::{
        repo::SessionStore,
        repo_types::Session,
        token::{generate_token, hash_token},
    },
    users::{
        repo::UserStore,
        repo_types::{User, UserCredentials, UserPage},
    },
};

struct SessionRow {
    user_id: i64,
    expires_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, UserCredentials>,
    sessions: HashMap<String, SessionRow>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|c| c.user.email == email && Some(c.user.id) != except)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    /// Moves a session's expiry, for exercising TTL handling.
    pub fn set_session_expiry(&self, token: &str, expires_at: OffsetDateTime) -> AppResult<()> {
        let mut tables = self.lock()?;
        let row = tables
            .sessions
            .get_mut(&hash_token(token))
            .ok_or(AppError::NotFound("session"))?;
        row.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, email: &str, name: &str, password_hash: &str) -> AppResult<User> {
        let mut tables = self.lock()?;
        if tables.email_taken(email, None) {
            return Err(AppError::DuplicateEmail);
        }
        tables.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: tables.last_id,
            email: email.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn credentials_by_email(&self, email: &str) -> AppResult<UserCredentials> {
        let tables = self.lock()?;
        tables
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or(AppError::NotFound("user"))
    }

    async fn list(&self, name_filter: &str, params: PaginationParams) -> AppResult<UserPage> {
        let params = params.normalized();
        let needle = name_filter.trim().to_lowercase();
        let tables = self.lock()?;

        let matching: Vec<&User> = tables
            .users
            .values()
            .map(|c| &c.user)
            .filter(|u| needle.is_empty() || u.name.to_lowercase().contains(&needle))
            .collect();

        let pagination = PaginationResult::compute(matching.len() as i64, params.page_size);
        let offset = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(params.limit()).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(UserPage {
            data,
            pagination,
            params,
        })
    }

    async fn get(&self, id: i64) -> AppResult<User> {
        let tables = self.lock()?;
        tables
            .users
            .get(&id)
            .map(|c| c.user.clone())
            .ok_or(AppError::NotFound("user"))
    }

    async fn update(&self, id: i64, name: &str, email: &str) -> AppResult<User> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&id) {
            return Err(AppError::NotFound("user"));
        }
        if tables.email_taken(email, Some(id)) {
            return Err(AppError::DuplicateEmail);
        }
        let creds = tables
            .users
            .get_mut(&id)
            .ok_or(AppError::NotFound("user"))?;
        creds.user.name = name.to_string();
        creds.user.email = email.to_string();
        creds.user.updated_at = OffsetDateTime::now_utc();
        Ok(creds.user.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tables = self.lock()?;
        tables
            .users
            .remove(&id)
            .ok_or(AppError::NotFound("user"))?;
        tables.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.users.len() as i64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> AppResult<Session> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound("user"));
        }
        let token = generate_token();
        let created_at = OffsetDateTime::now_utc();
        let expires_at = created_at + ttl;
        tables.sessions.insert(
            hash_token(&token),
            SessionRow {
                user_id,
                expires_at,
            },
        );
        Ok(Session {
            token,
            user_id,
            created_at,
            expires_at,
        })
    }

    async fn user(&self, token: &str) -> AppResult<User> {
        let tables = self.lock()?;
        let session = tables
            .sessions
            .get(&hash_token(token))
            .filter(|s| s.expires_at > OffsetDateTime::now_utc())
            .ok_or(AppError::NotFound("session"))?;
        tables
            .users
            .get(&session.user_id)
            .map(|c| c.user.clone())
            .ok_or(AppError::NotFound("user"))
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        self.lock()?.sessions.remove(&hash_token(token));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = UserStore::insert(&store, "admin@gmail.com", "admin", "hash")
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn session_resolves_to_its_user() {
        let (store, user) = store_with_user().await;
        let session = SessionStore::create(&store, user.id, Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(session.expires_at > session.created_at);

        let resolved = store.user(&session.token).await.unwrap();
        assert_eq!(resolved, user);
        assert!(matches!(store.user("bogus").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn users_may_hold_several_sessions() {
        let (store, user) = store_with_user().await;
        let a = SessionStore::create(&store, user.id, Duration::hours(1)).await.unwrap();
        let b = SessionStore::create(&store, user.id, Duration::hours(1)).await.unwrap();
        assert_ne!(a.token, b.token);

        SessionStore::delete(&store, &a.token).await.unwrap();
        assert!(store.user(&a.token).await.is_err());
        assert_eq!(store.user(&b.token).await.unwrap().id, user.id);
        SessionStore::delete(&store, &a.token).await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let (store, user) = store_with_user().await;
        let session = SessionStore::create(&store, user.id, Duration::hours(1))
            .await
            .unwrap();
        store
            .set_session_expiry(&session.token, OffsetDateTime::now_utc() - Duration::seconds(1))
            .unwrap();
        assert!(matches!(store.user(&session.token).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_a_user_drops_their_sessions() {
        let (store, user) = store_with_user().await;
        let session = SessionStore::create(&store, user.id, Duration::hours(1))
            .await
            .unwrap();
        UserStore::delete(&store, user.id).await.unwrap();
        assert!(store.user(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn sessions_need_an_existing_user() {
        let store = MemoryStore::new();
        let err = SessionStore::create(&store, 42, Duration::hours(1)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_keeps_email_unique() {
        let (store, _admin) = store_with_user().await;
        let staff = UserStore::insert(&store, "staff@gmail.com", "staff", "hash")
            .await
            .unwrap();
        let err = store
            .update(staff.id, "staff", "admin@gmail.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        let same = store.update(staff.id, "staff", "staff@gmail.com").await.unwrap();
        assert_eq!(same.email, "staff@gmail.com");
    }
}
