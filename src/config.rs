use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

/// Application-level constants
pub const APP_NAME: &str = "Medicare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_POOL_TIMEOUT_SECS: u64 = 5;

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "info,medicare_lib=debug".to_string()
}

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the SQLite database
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("medicare.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingJwtSecret,
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Credentials for the admin account created at startup if missing.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Process-wide configuration, loaded once at startup and passed down
/// explicitly.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: Zeroizing<Vec<u8>>,
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub pool_size: usize,
    pub pool_timeout: Duration,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;

        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let bind_addr = parse_or("BIND_ADDR", lookup("BIND_ADDR"), default_bind_addr)?;
        let pool_size: usize = parse_or("DB_POOL_SIZE", lookup("DB_POOL_SIZE"), || DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                value: "0".into(),
            });
        }
        let pool_timeout_secs: u64 = parse_or(
            "DB_POOL_TIMEOUT_SECS",
            lookup("DB_POOL_TIMEOUT_SECS"),
            || DEFAULT_POOL_TIMEOUT_SECS,
        )?;

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap {
                    name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                    email,
                    password: Zeroizing::new(password),
                })
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret: Zeroizing::new(jwt_secret.into_bytes()),
            database_path,
            bind_addr,
            pool_size,
            pool_timeout: Duration::from_secs(pool_timeout_secs),
            admin,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_path", &self.database_path)
            .field("bind_addr", &self.bind_addr)
            .field("pool_size", &self.pool_size)
            .field("pool_timeout", &self.pool_timeout)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

fn parse_or<T, D>(key: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    D: FnOnce() -> T,
{
    match raw {
        None => Ok(default()),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
