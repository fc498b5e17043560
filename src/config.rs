//! Runtime configuration, read from the environment.

use std::env;

use crate::auth::JwtConfig;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_URL: &str = "sqlite:tourguard.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// - `TOURGUARD_PORT` (default 3000)
    /// - `TOURGUARD_DATABASE_URL` (default `sqlite:tourguard.db?mode=rwc`)
    /// - `TOURGUARD_JWT_SECRET` (required, at least 32 bytes)
    /// - `TOURGUARD_JWT_ISSUER` (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = env::var("TOURGUARD_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let database_url =
            env::var("TOURGUARD_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_string());

        let secret = env::var("TOURGUARD_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("TOURGUARD_JWT_SECRET must be set"))?;
        let issuer = env::var("TOURGUARD_JWT_ISSUER")
            .ok()
            .filter(|i| !i.is_empty());

        Ok(Self {
            port,
            database_url,
            jwt: JwtConfig::try_new(secret, issuer)?,
        })
    }
}
