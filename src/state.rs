use std::sync::Arc;

use crate::auth::identity::{AssertionPassthrough, IdentityVerifier};
use crate::config::AppConfig;
use crate::db::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = PgStore::connect(&config).await?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
            tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        Ok(Self::from_parts(
            Arc::new(store),
            config,
            Arc::new(AssertionPassthrough),
        ))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            store,
            config,
            verifier,
        }
    }

    /// In-memory state for tests.
    pub fn fake() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "postgres://fake".into(),
            max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 60 * 24,
            },
            store_timeout_secs: 5,
            host: "127.0.0.1".into(),
            port: 0,
            allowed_origins: Vec::new(),
        });
        Self::from_parts(store, config, Arc::new(AssertionPassthrough))
    }
}
