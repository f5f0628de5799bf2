// src/config.rs

use crate::{
    common::cache::TieredCache,
    db::{InventoryRepository, ReportRepository},
    services::{InventoryService, ReportService},
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub cache_ttl_short: Duration,
    pub cache_ttl_medium: Duration,
    pub cache_ttl_long: Duration,
}

impl Config {
    /// Lê o ambiente do processo, depois de carregar o `.env` se existir.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            cache_ttl_short: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SHORT_SECS", 60)?),
            cache_ttl_medium: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_MEDIUM_SECS", 300)?),
            cache_ttl_long: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_LONG_SECS", 3600)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub inventory_service: InventoryService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database connection established");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Grafo de dependências ---
    pub fn with_pool(db_pool: PgPool, config: Config) -> Self {
        let cache = TieredCache::new(
            config.cache_ttl_short,
            config.cache_ttl_medium,
            config.cache_ttl_long,
        );
        let inventory_service = InventoryService::new(InventoryRepository::new(), cache);
        let report_service = ReportService::new(ReportRepository::new());

        Self {
            db_pool,
            config,
            inventory_service,
            report_service,
        }
    }
}
