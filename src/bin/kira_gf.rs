use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use kira_genome_fetch::app::{App, ProgressSink};
use kira_genome_fetch::config::{RunConfig, TransferClient};
use kira_genome_fetch::error::KiraError;
use kira_genome_fetch::fetcher::{DEFAULT_BACKOFF_UNIT, DEFAULT_RETRIES};
use kira_genome_fetch::ncbi::{NCBI_FTP_HOST, NcbiHttpClient};
use kira_genome_fetch::output::{JsonOutput, OutputMode, TextOutput};
use kira_genome_fetch::transfer::{Aria2cTransferrer, DEFAULT_CONNECTIONS, Transferrer};

#[derive(Parser)]
#[command(name = "kira-gf")]
#[command(about = "Bulk-download NCBI genome assemblies listed in a tab-separated genome list")]
#[command(version, author)]
struct Cli {
    /// Genome list: TSV with a header row, accession in column 1, assembly name in column 2
    #[arg(short = 'l', long = "GenomeList")]
    genome_list: PathBuf,

    /// Output directory; files land in <OutDir>/out
    #[arg(short = 'o', long = "OutDir", default_value = "./")]
    out_dir: PathBuf,

    /// Attempts per file before giving up
    #[arg(short = 'r', long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,

    /// Parallel connections per file (aria2c only)
    #[arg(short = 'x', long, default_value_t = DEFAULT_CONNECTIONS)]
    connections: u32,

    #[arg(long, value_enum, default_value_t = TransferClient::Aria2c)]
    client: TransferClient,

    /// Backoff unit in milliseconds; attempt n waits unit * 2^n
    #[arg(long, default_value_t = DEFAULT_BACKOFF_UNIT.as_millis() as u64)]
    backoff_ms: u64,

    /// Archive base URL
    #[arg(long, default_value = NCBI_FTP_HOST)]
    host: String,

    #[arg(long, default_value = "download.log")]
    log_file: PathBuf,

    /// Resolve URLs without downloading
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Without a subscriber the error can only go straight to stderr.
    if let Err(err) = init_logging(&cli.log_file) {
        eprintln!("{:?}", miette::Report::new(err));
        return ExitCode::from(1);
    }
    if let Err(report) = run(cli) {
        tracing::error!("{report}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> miette::Result<()> {

    let config = RunConfig {
        manifest: utf8_path(cli.genome_list)?,
        out_dir: utf8_path(cli.out_dir)?,
        retries: cli.retries,
        connections: cli.connections,
        backoff_unit: Duration::from_millis(cli.backoff_ms),
        host: cli.host,
        client: cli.client,
        dry_run: cli.dry_run,
    };
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let transferrer = build_transferrer(&config)?;
    let app = App::new(config, transferrer);
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &TextOutput,
    };
    let summary = app.run(sink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic(),
        OutputMode::Text => TextOutput::print_summary(&summary).into_diagnostic(),
    }
}

fn build_transferrer(config: &RunConfig) -> Result<Box<dyn Transferrer>, KiraError> {
    match config.client {
        TransferClient::Aria2c => {
            Ok(Box::new(Aria2cTransferrer::new(config.connections)))
        }
        TransferClient::Http => Ok(Box::new(NcbiHttpClient::new()?)),
    }
}

fn utf8_path(path: PathBuf) -> Result<Utf8PathBuf, KiraError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| KiraError::Filesystem(format!("path is not UTF-8: {}", path.display())))
}

fn init_logging(log_file: &Path) -> Result<(), KiraError> {
    let file = File::create(log_file).map_err(|err| KiraError::LogFile {
        path: log_file.to_path_buf(),
        message: err.to_string(),
    })?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| KiraError::LogFile {
            path: log_file.to_path_buf(),
            message: err.to_string(),
        })
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
