use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::KiraError;
use crate::ncbi::{encode_url, file_name};
use crate::transfer::Transferrer;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already held a file with the same name.
    AlreadyPresent,
    Downloaded { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, FetchOutcome::Exhausted { .. })
    }
}

/// Delay after the failed attempt `attempt` (0-based): `unit * 2^attempt`.
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

pub struct RetryingFetcher<T: Transferrer, S: Sleeper = ThreadSleeper> {
    transferrer: T,
    sleeper: S,
    retries: u32,
    backoff_unit: Duration,
}

impl<T: Transferrer, S: Sleeper> RetryingFetcher<T, S> {
    pub fn with_sleeper(transferrer: T, sleeper: S, retries: u32, backoff_unit: Duration) -> Self {
        Self {
            transferrer,
            sleeper,
            retries,
            backoff_unit,
        }
    }

    pub fn transferrer(&self) -> &T {
        &self.transferrer
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetches `url` into `dest_dir`, which must exist.
    ///
    /// Never fails: every error is logged and folded into the outcome.
    pub fn fetch(&self, url: &str, dest_dir: &Path) -> FetchOutcome {
        let name = match file_name(url) {
            Ok(name) => name,
            Err(err) => {
                error!("{err}");
                return FetchOutcome::Exhausted { attempts: 0 };
            }
        };
        if dest_dir.join(name).exists() {
            info!("Skipping download, file exists: {name}");
            return FetchOutcome::AlreadyPresent;
        }

        let encoded = encode_url(url);
        for attempt in 0..self.retries {
            info!(
                "Download attempt ({}/{}): {name}",
                attempt + 1,
                self.retries
            );
            match self.transferrer.fetch(&encoded, dest_dir) {
                Ok(()) => {
                    info!("Download successful: {name}");
                    return FetchOutcome::Downloaded {
                        attempts: attempt + 1,
                    };
                }
                Err(err @ (KiraError::TransferStatus { .. } | KiraError::HttpStatus { .. })) => {
                    warn!(
                        "Download failed ({}/{}): {name}: {err}",
                        attempt + 1,
                        self.retries
                    );
                }
                Err(err) => {
                    error!("Exception during download of {name}: {err}");
                }
            }
            if attempt + 1 < self.retries {
                self.sleeper.sleep(backoff_delay(self.backoff_unit, attempt));
            }
        }

        error!("Download failed after max retries: {name}");
        FetchOutcome::Exhausted {
            attempts: self.retries,
        }
    }
}
