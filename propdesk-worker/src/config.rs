//! Worker configuration
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
//! - `SWEEP_INTERVAL_SECS`: seconds between sweeps (default: 300)
//! - `LOG_FORMAT`: `json` for JSON logs

use std::env;
use std::time::Duration;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub sweep_interval_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", env::var("DATABASE_MAX_CONNECTIONS").ok(), 5)?;
        let sweep_interval_secs = parse_var(
            "SWEEP_INTERVAL_SECS",
            env::var("SWEEP_INTERVAL_SECS").ok(),
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;

        if sweep_interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            database_url,
            max_connections,
            sweep_interval_secs,
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_var<T>(key: &str, value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        None => Ok(default),
    }
}
