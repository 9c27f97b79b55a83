use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    pagination::{paginate, Filter, PaginationParams},
    users::repo_types::{User, UserCredentials, UserPage},
};

/// Persistence seam for the `users` relation. Implementations return
/// `AppError::NotFound` for missing rows and `AppError::DuplicateEmail` when the
/// unique email constraint is hit. Emails arrive already normalized.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, email: &str, name: &str, password_hash: &str) -> AppResult<User>;
    async fn credentials_by_email(&self, email: &str) -> AppResult<UserCredentials>;
    async fn list(&self, name_filter: &str, params: PaginationParams) -> AppResult<UserPage>;
    async fn get(&self, id: i64) -> AppResult<User>;
    async fn update(&self, id: i64, name: &str, email: &str) -> AppResult<User>;
    async fn delete(&self, id: i64) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, email: &str, name: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::from_write)
    }

    async fn credentials_by_email(&self, email: &str) -> AppResult<UserCredentials> {
        sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, email, name, created_at, updated_at, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("user"))
    }

    async fn list(&self, name_filter: &str, params: PaginationParams) -> AppResult<UserPage> {
        let params = params.normalized();
        let filter = Filter::new().contains_ci("u.name", name_filter);

        // Count and page fetch read one snapshot.
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let pagination = paginate(&mut *tx, "users u", &filter, &params).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT u.id, u.email, u.name, u.created_at, u.updated_at FROM users u",
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY u.id ASC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());
        let data = qb.build_query_as::<User>().fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok(UserPage {
            data,
            pagination,
            params,
        })
    }

    async fn get(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound("user"))
    }

    async fn update(&self, id: i64, name: &str, email: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, email = $2, updated_at = now()
            WHERE id = $3
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::from_write)?
        .ok_or(AppError::NotFound("user"))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let deleted: Option<i64> =
            sqlx::query_scalar(r#"DELETE FROM users WHERE id = $1 RETURNING id"#)
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        deleted.map(|_| ()).ok_or(AppError::NotFound("user"))
    }

    async fn count(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }
}
