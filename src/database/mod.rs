pub mod models;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::MarketplaceError;

/// Shared handle to the marketplace database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, MarketplaceError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to {}", database_url);
        Ok(Database { pool })
    }

    /// Single-connection in-memory database with migrations applied.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the
    /// pool is pinned to one connection that never expires.
    pub async fn new_in_memory() -> Result<Self, MarketplaceError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<(), MarketplaceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), MarketplaceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Fresh primary key for any table.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
