//! Application configuration loaded from environment.

use std::net::SocketAddr;

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. `0.0.0.0:3000`).
    pub server_addr: SocketAddr,
    /// Hosted provider application id.
    pub app_id: String,
    /// Hosted provider application key (public, sent to clients).
    pub app_key: String,
    /// Hosted provider secret for channel signing and webhook verification.
    pub app_secret: String,
    /// Hosted provider API host (e.g. `api.example-pubsub.com`).
    pub provider_host: String,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let server_addr =
            std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let app_id = std::env::var("PRPC_APP_ID").unwrap_or_else(|_| "app".to_string());
        let app_key = std::env::var("PRPC_APP_KEY").unwrap_or_else(|_| "prpc_key".to_string());
        let app_secret =
            std::env::var("PRPC_APP_SECRET").unwrap_or_else(|_| "prpc_secret".to_string());
        let provider_host = std::env::var("PRPC_PROVIDER_HOST")
            .unwrap_or_else(|_| "api.pubsub.example.com".to_string());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            server_addr,
            app_id,
            app_key,
            app_secret,
            provider_host,
            log_level,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,
}
