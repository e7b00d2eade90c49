use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

use tracing::warn;

use crate::error::KiraError;

pub const DEFAULT_CONNECTIONS: u32 = 16;

/// Moves one remote file into a local directory.
///
/// `url` is already percent-encoded. The file lands in `dest_dir` under the
/// URL's last path segment.
pub trait Transferrer {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError>;
}

impl<T: Transferrer + ?Sized> Transferrer for Box<T> {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError> {
        (**self).fetch(url, dest_dir)
    }
}

impl<T: Transferrer + ?Sized> Transferrer for &T {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError> {
        (**self).fetch(url, dest_dir)
    }
}

/// Shells out to `aria2c`, splitting each file over several connections.
#[derive(Debug)]
pub struct Aria2cTransferrer {
    program: PathBuf,
    connections: u32,
    resolved: bool,
    missing_warning: Once,
}

impl Aria2cTransferrer {
    pub fn new(connections: u32) -> Self {
        match find_in_path("aria2c") {
            Some(program) => Self::with_program(program, connections),
            None => Self {
                program: PathBuf::from("aria2c"),
                connections,
                resolved: false,
                missing_warning: Once::new(),
            },
        }
    }

    pub fn with_program(program: impl Into<PathBuf>, connections: u32) -> Self {
        Self {
            program: program.into(),
            connections,
            resolved: true,
            missing_warning: Once::new(),
        }
    }

    /// False when `aria2c` was not found on `PATH`; every fetch will then fail
    /// to spawn.
    pub fn is_available(&self) -> bool {
        self.resolved
    }

    pub fn args(&self, url: &str, dest_dir: &Path) -> Vec<String> {
        vec![
            "-x".to_string(),
            self.connections.to_string(),
            url.to_string(),
            "-d".to_string(),
            dest_dir.to_string_lossy().to_string(),
        ]
    }
}

impl Transferrer for Aria2cTransferrer {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError> {
        if !self.is_available() {
            self.missing_warning.call_once(|| {
                warn!("aria2c not found on PATH; downloads will fail (try --client http)");
            });
        }
        let output = Command::new(&self.program)
            .args(self.args(url, dest_dir))
            .output()
            .map_err(|err| {
                KiraError::TransferSpawn(format!("{}: {err}", self.program.display()))
            })?;
        if output.status.success() {
            return Ok(());
        }
        // aria2c reports most failures on stdout.
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            last_line(&String::from_utf8_lossy(&output.stdout))
                .unwrap_or_else(|| format!("command failed: {}", self.program.display()))
        } else {
            stderr
        };
        Err(KiraError::TransferStatus {
            status: output.status.to_string(),
            message,
        })
    }
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
