// src/main.rs

use anyhow::Context;
use clinic_inventory::config::{AppState, Config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("failed to run database migrations")?;

    tracing::info!("database migrations applied");

    let listener = TcpListener::bind(&app_state.config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", app_state.config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = clinic_inventory::app(app_state);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
