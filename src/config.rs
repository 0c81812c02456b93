//! Service configuration
//!
//! Read once at startup from flags, falling back to environment variables
//! (which `main` may have populated from a `.env` file).

use crate::auth::TokenConfig;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

/// Development signing key; accepted only with a startup warning
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

/// Minimum accepted signing key length in bytes
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Parser, Debug, Clone)]
#[command(name = "library-catalog")]
#[command(about = "Library catalog API with credential auth and role-gated book access")]
pub struct Config {
    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Identity database path
    #[arg(long, env = "AUTH_DB_PATH", default_value = "library_auth.db")]
    pub auth_db_path: String,

    /// Book catalog database path
    #[arg(long, env = "CATALOG_DB_PATH", default_value = "library_catalog.db")]
    pub catalog_db_path: String,

    /// HS256 signing key for bearer tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Token lifetime in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: i64,

    /// Simulated external review API latency in milliseconds
    #[arg(long, env = "EXTERNAL_DELAY_MS", default_value = "2000")]
    pub external_delay_ms: u64,
}

impl Config {
    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_hours <= 0 {
            bail!("TOKEN_TTL_HOURS must be positive, got {}", self.token_ttl_hours);
        }
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            bail!(
                "JWT_SECRET must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                self.jwt_secret.len()
            );
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Immutable token settings shared by the issuer and the access gate
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.jwt_secret.as_bytes(), self.token_ttl_hours)
    }

    pub fn external_delay(&self) -> Duration {
        Duration::from_millis(self.external_delay_ms)
    }
}
