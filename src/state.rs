use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    auth::repo::{PgUserStore, UserStore},
    catalog::repo::{PgProductStore, ProductStore},
    config::AppConfig,
    memory::{MemoryOrderStore, MemoryProductStore, MemoryUserStore},
    orders::repo::{OrderStore, PgOrderStore},
};

/// Shared per-process handles, injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl AppState {
    /// Connects the configured store. Returns the pool, if any, so the caller
    /// can run migrations and close it on shutdown.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, Option<PgPool>)> {
        let config = Arc::new(config);

        let Some(url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
            return Ok((Self::in_memory(config), None));
        };

        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await
            .context("connect to database")?;
        info!("connected to postgres");

        let state = Self {
            config,
            users: Arc::new(PgUserStore::new(db.clone())),
            products: Arc::new(PgProductStore::new(db.clone())),
            orders: Arc::new(PgOrderStore::new(db.clone())),
        };
        Ok((state, Some(db)))
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            users: Arc::new(MemoryUserStore::default()),
            products: Arc::new(MemoryProductStore::default()),
            orders: Arc::new(MemoryOrderStore::default()),
        }
    }

    /// Empty memory stores with a fixed test JWT config.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(Arc::new(AppConfig {
            database_url: None,
            database_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            seed_catalog: false,
        }))
    }
}
