use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Request file; stdin when unset.
    pub request_path: Option<PathBuf>,
}

impl Config {
    /// The first CLI argument wins over `STATDUNK_REQUEST_PATH`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            request_path: env::args()
                .nth(1)
                .or_else(|| env::var("STATDUNK_REQUEST_PATH").ok())
                .map(PathBuf::from),
        })
    }
}
