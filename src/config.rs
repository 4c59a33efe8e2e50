//! Environment-driven configuration.
//!
//! Every setting comes from the process environment (with `.env` loaded
//! first by `main`). The API key is the one hard requirement: without it the
//! service cannot perform a single lookup, so startup fails fast rather than
//! deferring the error to the first request.

use figment::providers::Env;
use figment::{Figment, error::Error as FigmentError};
use serde::Deserialize;

fn default_port() -> u16 {
    8080
}

fn default_cache_ttl_secs() -> u64 {
    60 * 60 * 24
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_places_base_url() -> String {
    "https://places.googleapis.com".to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Credential for the remote Places API. Required.
    pub google_places_api_key: String,
    /// Redis connection URL. Absent selects the in-process store.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// TTL applied to every cached lookup result.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_places_base_url")]
    pub places_base_url: String,
    /// Seconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
    /// Shared secret enabling the admin cache-purge endpoint. Absent
    /// disables the endpoint entirely.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Config {
    /// Extract configuration from the process environment.
    pub fn load() -> Result<Self, FigmentError> {
        Figment::new().merge(Env::raw()).extract()
    }
}
