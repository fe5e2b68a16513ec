use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Local notifications store (device tokens, delivery log, event journal)
    pub database_url: String,
    /// External SteVe charge-point store (read-only)
    pub steve_database_url: String,
    pub port: u16,
    /// Reconciliation tick cadence in milliseconds
    pub poll_interval_ms: u64,
    /// FCM legacy server key; dispatch reports failures when absent
    pub fcm_server_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            steve_database_url: env::var("STEVE_DATABASE_URL")
                .context("STEVE_DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            poll_interval_ms: env::var("POLLING_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("POLLING_INTERVAL_MS must be a valid number")?,
            fcm_server_key: env::var("FCM_SERVER_KEY").ok(),
        })
    }
}
