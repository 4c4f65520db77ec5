// ABOUTME: Environment-driven server configuration for the Stride engine
// ABOUTME: Loads ports, database URL, provider credentials, and sync defaults from env vars

//! Server configuration loaded from the environment.
//!
//! Configuration is environment-only; there are no config files. Every value
//! has a development-friendly default except the Strava client credentials,
//! which are required for any provider interaction.

use crate::errors::{AppError, AppResult};
use std::env;

/// Default sync window in days for both user-initiated and scheduled syncs
pub const DEFAULT_SYNC_DAYS: i64 = 7;

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// `SQLite` database URL
    pub database_url: String,
    /// Strava application client id
    pub strava_client_id: String,
    /// Strava application client secret
    pub strava_client_secret: String,
    /// Redirect URI registered with Strava
    pub strava_redirect_uri: String,
    /// Day window used when a sync request does not specify one
    pub sync_default_days: i64,
    /// Maximum athletes processed concurrently during scheduled fan-out
    pub sync_max_concurrency: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when Strava client credentials are missing or
    /// a numeric variable cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env_or("HTTP_PORT", 8080_u16)?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/stride.db".to_owned());

        let strava_client_id = env::var("STRAVA_CLIENT_ID")
            .map_err(|_| AppError::config("Missing STRAVA_CLIENT_ID environment variable"))?;
        let strava_client_secret = env::var("STRAVA_CLIENT_SECRET")
            .map_err(|_| AppError::config("Missing STRAVA_CLIENT_SECRET environment variable"))?;
        let strava_redirect_uri = env::var("STRAVA_REDIRECT_URI")
            .unwrap_or_else(|_| format!("http://localhost:{http_port}/api/oauth/callback"));

        let sync_default_days = parse_env_or("SYNC_DEFAULT_DAYS", DEFAULT_SYNC_DAYS)?;
        let sync_max_concurrency = parse_env_or("SYNC_MAX_CONCURRENCY", 4_usize)?;

        Ok(Self {
            http_port,
            database_url,
            strava_client_id,
            strava_client_secret,
            strava_redirect_uri,
            sync_default_days,
            sync_max_concurrency,
        })
    }
}

fn parse_env_or<T>(name: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
