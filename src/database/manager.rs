use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;

use super::BackendError;

/// Connection pool setup for the direct Postgres data backend.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Build the pool lazily; no connection is opened until the first query.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, BackendError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| BackendError::Transport("DATABASE_URL is not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(url)?;

        info!(
            "Created database pool (max_connections={})",
            config.max_connections
        );
        Ok(pool)
    }
}
