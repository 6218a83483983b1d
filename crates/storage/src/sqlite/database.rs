//! SQLite database connection and configuration.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

use digidex_core::error::{StoreError, StoreResult};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. `sqlite://digidex.db`).
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection acquisition timeout.
    pub acquire_timeout: Duration,
    /// Create the database file if it does not exist yet.
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://digidex.db".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    /// Create config from environment variable.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://digidex.db".to_string()),
            ..Default::default()
        }
    }

    /// Create a configuration for the given URL.
    pub fn for_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// In-memory database, one shared connection. Used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database with the given configuration.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        debug!(url = %config.url, max_conn = config.max_connections, "Opening record cache");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        debug!("Record cache opened");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StoreResult<()> {
        debug!("Running migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationError(e.to_string()))?;

        debug!("Migrations completed");

        Ok(())
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Purge all cached records.
    ///
    /// Removes every cached record while preserving the schema and
    /// migrations tracking. The cache repopulates lazily on the next run.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StoreResult<PurgeStats> {
        debug!("Starting cache purge");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query("DELETE FROM records")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        debug!("Cache purge completed");

        Ok(PurgeStats {
            records_removed: count.0 as u64,
        })
    }
}

/// Statistics from a cache purge operation.
#[derive(Debug, Clone)]
pub struct PurgeStats {
    /// Number of cached records removed.
    pub records_removed: u64,
}
