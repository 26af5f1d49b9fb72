//! Application configuration, loaded from environment variables.

use std::net::SocketAddr;

use crate::persistence::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Database settings
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables
    ///
    /// - `PAPERTRADE_ADDR`: bind address (default "127.0.0.1:3000")
    /// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: see [`DatabaseConfig`]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("PAPERTRADE_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

        Self {
            bind_addr,
            database: DatabaseConfig::from_env(),
        }
    }
}
