mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use dotenv::dotenv;
use statdunk_core::{handle_request, PgStatsStore, PoolConfig, StatsRegistry};
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr; stdout carries only the response.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting StatDunk query service...");

    let config = Config::from_env()?;

    let request = match &config.request_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };

    // Database
    let pool = PoolConfig::from_env_with_defaults(PoolConfig::default())
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStatsStore::new(pool));

    let mut registry = StatsRegistry::new(store).await?;
    let response = handle_request(&mut registry, &request).await;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
