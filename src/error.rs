use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid genome accession: {0}")]
    #[diagnostic(help("expected a code like GCF_000001405 or GCA_000001405.29"))]
    InvalidGenomeAccession(String),

    #[error("invalid download URL: {0}")]
    InvalidUrl(String),

    #[error("genome list does not exist: {0}")]
    ManifestMissing(PathBuf),

    #[error("genome list is not readable: {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("malformed manifest row {line}: {message}")]
    ManifestRow { line: u64, message: String },

    #[error("failed to create directories: {0}")]
    CreateDir(String),

    #[error("failed to open log file {path}: {message}")]
    LogFile { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to invoke transfer client: {0}")]
    TransferSpawn(String),

    #[error("transfer client exited with {status}: {message}")]
    TransferStatus { status: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("archive returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },
}
