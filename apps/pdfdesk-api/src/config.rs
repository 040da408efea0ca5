//! Runtime configuration read from the environment

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Account created at startup when absent
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub geoip_database_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Defaults for everything except the signing secret and database
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: DEFAULT_PORT,
            jwt_secret: jwt_secret.into(),
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
            geoip_database_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            admin_seed: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::MissingJwtSecret)?;
        let database_url = get("DATABASE_URL").unwrap_or_else(default_database_url);
        let mut config = Config::new(database_url, jwt_secret);

        if let Some(port) = get("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(minutes) = get("JWT_ACCESS_TOKEN_EXPIRE_MINUTES") {
            config.access_token_minutes = parse("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", &minutes)?;
        }
        if let Some(mb) = get("MAX_UPLOAD_MB") {
            let mb: usize = parse("MAX_UPLOAD_MB", &mb)?;
            config.max_upload_bytes = mb * 1024 * 1024;
        }
        config.geoip_database_path = get("GEOIP_DATABASE_PATH").map(PathBuf::from);
        config.admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn default_database_url() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfdesk");
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!("Could not create data directory {}: {}", data_dir.display(), e);
    }
    format!("sqlite:{}/pdfdesk.db?mode=rwc", data_dir.display())
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
