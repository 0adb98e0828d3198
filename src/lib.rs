pub mod accounts;
pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod health_metrics;
pub mod models;
pub mod scheduling;
pub mod token;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::db::{DatabaseError, DbPool};
use crate::token::TokenService;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Admin bootstrap failed: {0}")]
    Admin(#[from] accounts::AccountError),
    #[error("Server error: {0}")]
    Server(#[from] api::ServerError),
    #[error("Failed to create data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// built-in default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration, open the store and serve until ctrl-c.
pub async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    tracing::debug!(?config, "Configuration loaded");

    let ctx = build_context(&config).await?;
    let mut server = api::start_server(ctx, config.bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}

/// Open the pool, run migrations and create the bootstrap admin.
pub async fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tokens = TokenService::new(&config.jwt_secret)?;
    let db = DbPool::open(&config.database_path, config.pool_size, config.pool_timeout)?;

    if let Some(admin) = &config.admin {
        let conn = db.acquire().await?;
        if accounts::ensure_admin(&conn, admin)? {
            tracing::info!(email = %admin.email, "Admin account created from configuration");
        }
    }

    Ok(ApiContext::new(db, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_for(dir: &tempfile::TempDir, admin: bool) -> AppConfig {
        let db_path = dir.path().join("nested").join("medicare.db");
        let mut vars: HashMap<&str, String> = HashMap::from([
            ("JWT_SECRET", "lib-test-secret".to_string()),
            ("DATABASE_PATH", db_path.display().to_string()),
        ]);
        if admin {
            vars.insert("ADMIN_EMAIL", "root@example.com".into());
            vars.insert("ADMIN_PASSWORD", "changeme".into());
        }
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn context_creates_database_and_admin() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, true);

        let ctx = build_context(&config).await.unwrap();
        assert!(config.database_path.exists());

        let conn = ctx.db.acquire().await.unwrap();
        let admin = db::repository::get_user_by_email(&conn, "root@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, models::Role::Admin);
    }

    #[tokio::test]
    async fn context_without_admin_has_no_users() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = build_context(&config_for(&dir, false)).await.unwrap();
        let conn = ctx.db.acquire().await.unwrap();
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 0);
    }
}
