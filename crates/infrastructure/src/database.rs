//! Database connection and migration helpers.

use std::env;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use billport_core::{AppError, AppResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection settings for the PostgreSQL store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Loads settings from the environment.
    ///
    /// `DATABASE_URL` is required; `DATABASE_MAX_CONNECTIONS` defaults to 5.
    pub fn from_env() -> AppResult<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => value.parse::<u32>().map_err(|error| {
                AppError::Validation(format!("invalid DATABASE_MAX_CONNECTIONS: {error}"))
            })?,
            Err(_) => 5,
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}

/// Opens a connection pool against the configured database.
pub async fn connect(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Applies pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    info!("database migrations applied");
    Ok(())
}
