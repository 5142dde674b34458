//! Application configuration loaded from environment variables.

use std::env;

use mblog_infra::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    /// Apply pending migrations before serving.
    pub run_migrations: bool,
    pub site: SiteConfig,
}

/// Presentation settings shared by every page.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub title: String,
    /// Homepage excerpt length, in characters.
    pub excerpt_chars: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "mblog".to_string(),
            excerpt_chars: 200,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = SiteConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            run_migrations: env::var("RUN_MIGRATIONS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            site: SiteConfig {
                title: env::var("SITE_TITLE").unwrap_or(defaults.title),
                excerpt_chars: env::var("EXCERPT_CHARS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.excerpt_chars),
            },
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off")
}
