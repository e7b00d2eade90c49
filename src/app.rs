use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::config::RunConfig;
use crate::error::KiraError;
use crate::fetcher::{FetchOutcome, RetryingFetcher, Sleeper, ThreadSleeper};
use crate::manifest::{ManifestReader, ManifestRow};
use crate::ncbi::{derive_genome_url, file_name};
use crate::store::Store;
use crate::transfer::Transferrer;

/// A resolved download for one manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub dest_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Success {
        line: u64,
        accession: String,
        url: String,
        path: String,
        action: String,
    },
    Skipped {
        line: u64,
    },
    Failed {
        line: u64,
        accession: Option<String>,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rows: Vec<RowOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Success { .. } => self.success += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
            RowOutcome::Failed { .. } => self.failed += 1,
        }
        self.rows.push(outcome);
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<T: Transferrer, S: Sleeper = ThreadSleeper> {
    config: RunConfig,
    store: Store,
    fetcher: RetryingFetcher<T, S>,
}

impl<T: Transferrer> App<T, ThreadSleeper> {
    pub fn new(config: RunConfig, transferrer: T) -> Self {
        Self::with_sleeper(config, transferrer, ThreadSleeper)
    }
}

impl<T: Transferrer, S: Sleeper> App<T, S> {
    pub fn with_sleeper(config: RunConfig, transferrer: T, sleeper: S) -> Self {
        let store = Store::new(config.out_dir.clone());
        let fetcher =
            RetryingFetcher::with_sleeper(transferrer, sleeper, config.retries, config.backoff_unit);
        Self {
            config,
            store,
            fetcher,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn fetcher(&self) -> &RetryingFetcher<T, S> {
        &self.fetcher
    }

    /// Downloads every row of the manifest, one at a time.
    ///
    /// Errors only for startup problems (output tree, manifest). Per-row
    /// failures are recorded in the summary and never stop the run.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunSummary, KiraError> {
        if !self.config.dry_run {
            self.store.ensure_layout()?;
        }
        let reader = ManifestReader::open(self.config.manifest.as_std_path())?;
        info!("Reading genome list: {}", self.config.manifest);

        let mut summary = RunSummary {
            started_at: Utc::now().to_rfc3339(),
            finished_at: String::new(),
            success: 0,
            failed: 0,
            skipped: 0,
            rows: Vec::new(),
        };

        for row in reader {
            let started = Instant::now();
            let outcome = self.process_row(row);
            sink.event(ProgressEvent {
                message: describe(&outcome),
                elapsed: Some(started.elapsed()),
            });
            summary.record(outcome);
        }

        summary.finished_at = Utc::now().to_rfc3339();
        info!(
            "Download completed. Success: {}, Failed: {}",
            summary.success, summary.failed
        );
        Ok(summary)
    }

    pub fn task_for(&self, row: &ManifestRow) -> Result<DownloadTask, KiraError> {
        let url = derive_genome_url(&self.config.host, &row.accession, &row.assembly)?;
        Ok(DownloadTask {
            url,
            dest_dir: self.store.download_dir().into_std_path_buf(),
        })
    }

    pub fn process_row(&self, row: Result<ManifestRow, KiraError>) -> RowOutcome {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                let line = match &err {
                    KiraError::ManifestRow { line, .. } => *line,
                    _ => 0,
                };
                error!("Error processing row {line}: {err}");
                return RowOutcome::Failed {
                    line,
                    accession: None,
                    reason: err.to_string(),
                };
            }
        };
        if row.is_blank() {
            return RowOutcome::Skipped { line: row.line };
        }

        let task = match self.task_for(&row) {
            Ok(task) => task,
            Err(err) => {
                error!("Error processing row {}: {err}", row.line);
                return RowOutcome::Failed {
                    line: row.line,
                    accession: Some(row.accession),
                    reason: err.to_string(),
                };
            }
        };
        let path = file_name(&task.url)
            .map(|name| self.store.download_path(name).to_string())
            .unwrap_or_default();

        if self.config.dry_run {
            info!("Dry run, would download {}", task.url);
            return RowOutcome::Success {
                line: row.line,
                accession: row.accession,
                url: task.url,
                path,
                action: "dry-run".to_string(),
            };
        }

        match self.fetcher.fetch(&task.url, &task.dest_dir) {
            FetchOutcome::Exhausted { attempts } => RowOutcome::Failed {
                line: row.line,
                accession: Some(row.accession),
                reason: format!("download failed after {attempts} attempts"),
            },
            outcome => RowOutcome::Success {
                line: row.line,
                accession: row.accession,
                url: task.url,
                path,
                action: match outcome {
                    FetchOutcome::AlreadyPresent => "existing".to_string(),
                    _ => "downloaded".to_string(),
                },
            },
        }
    }
}

fn describe(outcome: &RowOutcome) -> String {
    match outcome {
        RowOutcome::Success {
            line,
            accession,
            action,
            ..
        } => format!("row {line}: {accession} {action}"),
        RowOutcome::Skipped { line } => format!("row {line}: skipped (no accession)"),
        RowOutcome::Failed {
            line,
            accession,
            reason,
        } => format!(
            "row {line}: {} failed: {reason}",
            accession.as_deref().unwrap_or("<unreadable>")
        ),
    }
}
