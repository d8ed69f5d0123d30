// src/utils/db_connect.rs
use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::info;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use crate::error::{TaxonomyError, TaxonomyResult};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Connection settings. Host, database and user are required; a batch job cannot
/// touch a single entity without them, so a missing value fails the run up front.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_pool_size: u32,
}

impl StoreConfig {
    pub fn from_env() -> TaxonomyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> TaxonomyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TaxonomyError::Configuration(format!("{} is not set", key)))
        };

        let port = match lookup("POSTGRES_PORT") {
            Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<u16>().map_err(|_| {
                TaxonomyError::Configuration(format!(
                    "POSTGRES_PORT '{}' is not a port number",
                    raw
                ))
            })?,
            _ => 5432,
        };
        // Serial processing; a handful of connections is plenty.
        let max_pool_size = lookup("POSTGRES_POOL_SIZE")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);

        Ok(Self {
            host: required("POSTGRES_HOST")?,
            port,
            dbname: required("POSTGRES_DB")?,
            user: required("POSTGRES_USER")?,
            password: lookup("POSTGRES_PASSWORD").unwrap_or_default(),
            max_pool_size,
        })
    }

    fn pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password);
        config.application_name("agent_taxonomy");
        config.connect_timeout(Duration::from_secs(10));
        config
    }
}

/// Initializes the connection pool and checks it with a trivial query.
pub async fn connect(store_config: &StoreConfig) -> Result<PgPool> {
    info!(
        "DB Config: Host={}, Port={}, DB={}, User={}",
        store_config.host, store_config.port, store_config.dbname, store_config.user
    );
    let manager = PostgresConnectionManager::new(store_config.pg_config(), NoTls);

    let pool = Pool::builder()
        .max_size(store_config.max_pool_size)
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    let conn = pool
        .get()
        .await
        .context("Failed to get test connection from pool")?;
    conn.query_one("SELECT 1", &[])
        .await
        .context("Test query 'SELECT 1' failed")?;
    drop(conn);
    info!("Database connection pool initialized successfully.");
    Ok(pool)
}

/// (connections, idle connections)
pub fn get_pool_status(pool: &PgPool) -> (u32, u32) {
    let state = pool.state();
    (state.connections, state.idle_connections)
}
