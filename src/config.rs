use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::ValueEnum;

use crate::fetcher::{DEFAULT_BACKOFF_UNIT, DEFAULT_RETRIES};
use crate::ncbi::NCBI_FTP_HOST;
use crate::transfer::DEFAULT_CONNECTIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransferClient {
    /// External `aria2c` with parallel segments.
    Aria2c,
    /// Built-in HTTPS client.
    Http,
}

impl fmt::Display for TransferClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferClient::Aria2c => write!(f, "aria2c"),
            TransferClient::Http => write!(f, "http"),
        }
    }
}

/// Everything a run needs, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub manifest: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub retries: u32,
    pub connections: u32,
    pub backoff_unit: Duration,
    pub host: String,
    pub client: TransferClient,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn new(manifest: Utf8PathBuf, out_dir: Utf8PathBuf) -> Self {
        Self {
            manifest,
            out_dir,
            ..Self::default()
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            manifest: Utf8PathBuf::new(),
            out_dir: Utf8PathBuf::from("./"),
            retries: DEFAULT_RETRIES,
            connections: DEFAULT_CONNECTIONS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            host: NCBI_FTP_HOST.to_string(),
            client: TransferClient::Aria2c,
            dry_run: false,
        }
    }
}
