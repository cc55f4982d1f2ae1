use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::auth::{AuthProvider, GoTrueClient};
use crate::config::{AppConfig, DataBackend};
use crate::database::{DatabaseManager, PgStore, PostgrestStore, TenantStore};
use crate::middleware::SessionResolver;

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn TenantStore>,
    pub sessions: SessionResolver,
}

impl AppState {
    pub fn new(config: AppConfig, auth: Arc<dyn AuthProvider>, store: Arc<dyn TenantStore>) -> Self {
        let sessions = SessionResolver::new(auth.clone(), config.security.access_cookie.clone());
        Self {
            config: Arc::new(config),
            auth,
            store,
            sessions,
        }
    }

    /// Build the backend clients described by `config`.
    ///
    /// Nothing here touches the network; the Postgres pool connects lazily.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.supabase.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let auth = GoTrueClient::new(http.clone(), &config.supabase)
            .context("invalid auth service URL")?;

        let store: Arc<dyn TenantStore> = match config.database.backend {
            DataBackend::Rest => {
                info!("Using PostgREST data backend at {}", config.supabase.url);
                Arc::new(
                    PostgrestStore::new(http, &config.supabase).context("invalid data API URL")?,
                )
            }
            DataBackend::Postgres => {
                info!("Using direct Postgres data backend");
                let pool = DatabaseManager::connect_lazy(&config.database)
                    .context("failed to create database pool")?;
                Arc::new(PgStore::new(pool))
            }
        };

        Ok(Self::new(config, Arc::new(auth), store))
    }
}
