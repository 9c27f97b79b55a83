use userhub::{config::DbConfig, db, seed::seed_users, users::PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "userhub=info,seed=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = DbConfig::from_env()?;
    let pool = db::connect(&cfg).await?;
    db::migrate(&pool).await?;

    tracing::info!("starting seeders");
    let store = PgUserStore::new(pool.clone());
    let created = seed_users(&store).await?;
    tracing::info!(created, "seeding completed");

    pool.close().await;
    Ok(())
}
