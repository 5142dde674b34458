//! Application state - shared across all handlers.

use std::sync::Arc;

use thiserror::Error;

use mblog_core::PostStore;
use mblog_core::ports::PostRepository;
use mblog_infra::InMemoryPostRepository;

#[cfg(feature = "postgres")]
use mblog_infra::PostgresPostRepository;

use crate::config::{AppConfig, SiteConfig};

/// Failures that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Database connection failed: {0}")]
    Database(String),

    #[error("Applying migrations failed: {0}")]
    Migration(String),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostStore,
    pub site: SiteConfig,
}

impl AppState {
    pub fn new(posts: PostStore, site: SiteConfig) -> Self {
        Self { posts, site }
    }

    /// State over an empty in-memory store.
    #[cfg(test)]
    pub fn in_memory(site: SiteConfig) -> Self {
        Self::new(PostStore::new(Arc::new(InMemoryPostRepository::new())), site)
    }

    /// Build the application state with the configured repository.
    ///
    /// Without `DATABASE_URL` the server runs on the in-memory store. A
    /// configured database that cannot be reached is fatal.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let repo = Self::repository(config).await?;

        tracing::info!("Application state initialized");
        Ok(Self::new(PostStore::new(repo), config.site.clone()))
    }

    #[cfg(feature = "postgres")]
    async fn repository(config: &AppConfig) -> Result<Arc<dyn PostRepository>, StartupError> {
        use migration::MigratorTrait;

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Ok(Arc::new(InMemoryPostRepository::new()));
        };

        let conn = mblog_infra::connect(db_config)
            .await
            .map_err(|e| StartupError::Database(e.to_string()))?;

        if config.run_migrations {
            migration::Migrator::up(&conn, None)
                .await
                .map_err(|e| StartupError::Migration(e.to_string()))?;
            tracing::info!("Migrations applied");
        }

        Ok(Arc::new(PostgresPostRepository::new(conn)))
    }

    #[cfg(not(feature = "postgres"))]
    async fn repository(config: &AppConfig) -> Result<Arc<dyn PostRepository>, StartupError> {
        if config.database.is_some() {
            tracing::warn!("Built without postgres feature - ignoring DATABASE_URL");
        }
        tracing::info!("Running with in-memory repository");
        Ok(Arc::new(InMemoryPostRepository::new()))
    }
}
