//! Game-state persistence: the store contracts, their PostgreSQL and
//! in-memory implementations, and the connection pool.

use sqlx::postgres::{PgPool, PgPoolOptions};

pub mod blob;
pub mod config;
pub mod errors;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use blob::{SCHEMA_VERSION, decode_state, encode_state};
pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::{InMemorySessionStore, InMemoryStateStore};
pub use repository::{
    PgSessionStore, PgStateStore, PlayerRecord, SessionStore, StateStore, StoredState,
};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens a pool sized by `config`.
    ///
    /// ```no_run
    /// use golf::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::development()).await?;
    ///     let states = db.state_store();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn state_store(&self) -> PgStateStore {
        PgStateStore::new(self.pool.clone())
    }

    pub fn session_store(&self) -> PgSessionStore {
        PgSessionStore::new(self.pool.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
