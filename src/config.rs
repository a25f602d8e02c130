use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_JWT_EXPIRY_SECS: u64 = 36_000;
const DEFAULT_JWT_REMEMBER_EXPIRY_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, loaded once in `main` and shared through `AppState`.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub jwt_expiry_secs: u64,
    pub jwt_remember_expiry_secs: u64,
    pub run_migrations: bool,
    pub log_dir: PathBuf,
}

impl Config {
    /// Builds a config with every optional setting at its default.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            host: "127.0.0.1".to_string(),
            port: 4000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            db_max_connections: 10,
            db_min_connections: 2,
            jwt_expiry_secs: DEFAULT_JWT_EXPIRY_SECS,
            jwt_remember_expiry_secs: DEFAULT_JWT_REMEMBER_EXPIRY_SECS,
            run_migrations: true,
            log_dir: PathBuf::from("logs"),
        }
    }

    /// Load environment variables and apply defaults.
    ///
    /// `.env` is expected to be loaded by the caller (see `main`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let defaults = Self::new(database_url, jwt_secret);

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host.clone()),
            port: parsed("PORT", defaults.port)?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir.clone()),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_min_connections: parsed("DB_MIN_CONNECTIONS", defaults.db_min_connections)?,
            jwt_expiry_secs: parsed("JWT_EXPIRY_SECS", defaults.jwt_expiry_secs)?,
            jwt_remember_expiry_secs: parsed(
                "JWT_REMEMBER_EXPIRY_SECS",
                defaults.jwt_remember_expiry_secs,
            )?,
            run_migrations: parsed("RUN_MIGRATIONS", defaults.run_migrations)?,
            log_dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir.clone()),
            ..defaults
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
