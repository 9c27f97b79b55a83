use async_trait::async_trait;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    sessions::{
        repo_types::Session,
        token::{generate_token, hash_token},
    },
    users::repo_types::User,
};

/// Persistence seam for the `sessions` relation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issues a new token for `user_id`, valid for `ttl`.
    async fn create(&self, user_id: i64, ttl: Duration) -> AppResult<Session>;
    /// Resolves an unexpired token to its user, `NotFound` otherwise.
    async fn user(&self, token: &str) -> AppResult<User>;
    /// Removes the session; unknown tokens are ignored.
    async fn delete(&self, token: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> AppResult<Session> {
        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + ttl;
        let (created_at, expires_at): (OffsetDateTime, OffsetDateTime) = sqlx::query_as(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING created_at, expires_at
            "#,
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        debug!(user_id, %expires_at, "session created");
        Ok(Session {
            token,
            user_id,
            created_at,
            expires_at,
        })
    }

    async fn user(&self, token: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > now()
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("session"))
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE token_hash = $1"#)
            .bind(hash_token(token))
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
