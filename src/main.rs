use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use story_api::config;
use story_api::database::{schema, DatabaseManager, PgStoryStore};
use story_api::storage::LocalDisk;
use story_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("story_api=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::config();
    tracing::info!("Starting Story API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    if config.database.auto_migrate {
        schema::ensure_schema(&pool).await.context("failed to create schema")?;
    }

    let public_root = &config.storage.public_root;
    tokio::fs::create_dir_all(public_root)
        .await
        .with_context(|| format!("failed to create public disk at {}", public_root))?;

    let state = AppState::new(
        Arc::new(PgStoryStore::new(pool)),
        Arc::new(LocalDisk::new(public_root)),
        Arc::new(config.clone()),
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Story API listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
