//! Runtime settings read from environment variables.
//!
//! Every setting has a default so the service starts with an empty environment.
//! Values that are present but malformed are a configuration error rather than being
//! silently replaced.

use crate::errors::{Error, Result};
use std::{fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};
use tracing::{info, warn};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";
const DEFAULT_UPLOAD_DIR: &str = "uploads/candidates";
const DEFAULT_MAX_FINALISTS: usize = 5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SEED_FILE: &str = "config.toml";

/// Application settings shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Database connection URL
    pub database_url: String,
    /// Username expected in the admin Basic credentials
    pub admin_user: String,
    /// Password expected in the admin Basic credentials
    pub admin_password: String,
    /// Directory where candidate images are written
    pub upload_dir: PathBuf,
    /// Finalist cap used when a selection request does not name one
    pub max_finalists: usize,
    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Optional TOML file with categories and codes to seed
    pub seed_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            database_url: super::database::get_database_url(),
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_finalists: DEFAULT_MAX_FINALISTS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: Vec::new(),
            seed_file: PathBuf::from(DEFAULT_SEED_FILE),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup.
    ///
    /// `lookup` returns `None` for unset keys; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let admin_user = get("ADMIN_USER").unwrap_or_else(|| DEFAULT_ADMIN_USER.to_string());
        let admin_password =
            get("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
        if admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("ADMIN_PASSWORD not set, admin routes use the default password");
        }

        let cors_origins = get("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: parse_or_default("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?,
            database_url: get("DATABASE_URL").unwrap_or_else(super::database::get_database_url),
            admin_user,
            admin_password,
            upload_dir: get("UPLOAD_DIR").map_or_else(|| DEFAULT_UPLOAD_DIR.into(), PathBuf::from),
            max_finalists: parse_or_default(
                "MAX_FINALISTS",
                get("MAX_FINALISTS"),
                &DEFAULT_MAX_FINALISTS.to_string(),
            )?,
            max_upload_bytes: parse_or_default(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES"),
                &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
            )?,
            cors_origins,
            seed_file: get("SEED_FILE").map_or_else(|| DEFAULT_SEED_FILE.into(), PathBuf::from),
        })
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("Invalid {key} value {raw:?}: {e}"),
    })
}
