//! Database connection pool configuration.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Postgres pool sizing and timeouts. Timeouts are whole seconds in the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        // One request at a time: a couple of connections is plenty.
        Self {
            max_connections: 4,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str, default: Duration) -> Duration {
    env_parse(name).map(Duration::from_secs).unwrap_or(default)
}

impl PoolConfig {
    /// `DB_*` overrides on top of `defaults`; unparsable values are ignored.
    pub fn from_env_with_defaults(defaults: Self) -> Self {
        Self {
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            min_connections: env_parse("DB_MIN_CONNECTIONS").unwrap_or(defaults.min_connections),
            acquire_timeout: env_secs("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout),
            idle_timeout: env_secs("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            max_lifetime: env_secs("DB_MAX_LIFETIME_SECS", defaults.max_lifetime),
        }
    }

    pub async fn connect(&self, database_url: &str) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(database_url)
            .await
            .context("Failed to connect to the stats database")?;

        info!(
            "Stats database pool ready ({}..={} connections)",
            self.min_connections, self.max_connections
        );

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_is_small() {
        let config = PoolConfig::default();
        assert!(config.min_connections <= config.max_connections);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_secs_falls_back() {
        assert_eq!(
            env_secs("STATDUNK_TEST_UNSET_TIMEOUT", Duration::from_secs(7)),
            Duration::from_secs(7)
        );
        assert_eq!(env_parse::<u32>("STATDUNK_TEST_UNSET_MAX"), None);
    }
}
