//! Configuration management for the Bitbuy client CLI.
//!
//! Loads settings from environment variables and config files. The library
//! itself never reads configuration; callers hand credentials to
//! [`BitbuyClient`](crate::exchange::BitbuyClient) directly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::exchange::PRODUCTION_BASE_URL;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bitbuy partner API credentials and endpoint
    #[serde(default)]
    pub bitbuy: BitbuyConfig,
    /// Request handling
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BitbuyConfig {
    /// Public key, sent with every request
    #[serde(default)]
    pub public_key: String,
    /// Private key for signing requests
    #[serde(default)]
    pub private_key: String,
    /// API origin, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Deadline for a single CLI request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    PRODUCTION_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment variables and config files.
    ///
    /// Environment variables use the `BITBUY` prefix and `__` as the section
    /// separator, e.g. `BITBUY_BITBUY__PUBLIC_KEY`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("BITBUY"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.bitbuy.public_key.is_empty(),
            "bitbuy.public_key must be set"
        );

        anyhow::ensure!(
            !self.bitbuy.private_key.is_empty(),
            "bitbuy.private_key must be set"
        );

        anyhow::ensure!(
            self.bitbuy.base_url.starts_with("http://")
                || self.bitbuy.base_url.starts_with("https://"),
            "bitbuy.base_url must be an http(s) URL"
        );

        anyhow::ensure!(
            self.http.request_timeout_secs > 0,
            "http.request_timeout_secs must be greater than 0"
        );

        Ok(())
    }
}

impl Default for BitbuyConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            private_key: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for BitbuyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbuyConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
