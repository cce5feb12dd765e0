use std::env;

use actix_web::http::header::HeaderName;

use crate::identity::DEFAULT_IDENTITY_HEADER;

pub const API_PREFIX: &str = "/api";

/// Server settings, read from the environment with defaults for everything.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// Directory the datastore persists its collections in, empty keeps
    /// everything in memory
    pub db_dir: String,
    /// Request header carrying the caller identity
    pub identity_header: HeaderName,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 1337,
            db_dir: "db".to_string(),
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_dir: lookup("DB_DIR").unwrap_or(defaults.db_dir),
            identity_header: lookup("IDENTITY_HEADER")
                .and_then(|h| HeaderName::from_bytes(h.as_bytes()).ok())
                .unwrap_or(defaults.identity_header),
        }
    }
}
