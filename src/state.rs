use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::AppConfig,
    csrf::CsrfGuard,
    db,
    memory::MemoryStore,
    sessions::{PgSessionStore, SessionStore},
    users::{PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub csrf: CsrfGuard,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Reads the environment, connects to Postgres and applies migrations.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let db = db::connect(&config.db).await?;
        db::migrate(&db).await?;
        Ok(Self::from_pool(db, config))
    }

    pub fn from_pool(db: PgPool, config: AppConfig) -> Self {
        Self::from_parts(
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgSessionStore::new(db)),
            config,
        )
    }

    /// Both stores backed by one shared [`MemoryStore`].
    pub fn in_memory(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        Self::from_parts(Arc::new(store.clone()), Arc::new(store), config)
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        config: AppConfig,
    ) -> Self {
        let csrf = CsrfGuard::new(config.csrf.key.as_bytes(), config.csrf.secure);
        Self {
            users,
            sessions,
            csrf,
            config: Arc::new(config),
        }
    }
}
