use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::KiraError;

const DOWNLOAD_SUBDIR: &str = "out";

/// Output tree of a run: `<out_root>/out/<file>`.
#[derive(Debug, Clone)]
pub struct Store {
    out_root: Utf8PathBuf,
}

impl Store {
    pub fn new(out_root: Utf8PathBuf) -> Self {
        Self { out_root }
    }

    pub fn out_root(&self) -> &Utf8Path {
        &self.out_root
    }

    pub fn download_dir(&self) -> Utf8PathBuf {
        self.out_root.join(DOWNLOAD_SUBDIR)
    }

    pub fn download_path(&self, file_name: &str) -> Utf8PathBuf {
        self.download_dir().join(file_name)
    }

    pub fn ensure_layout(&self) -> Result<(), KiraError> {
        for dir in [self.out_root.clone(), self.download_dir()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| KiraError::CreateDir(format!("{dir}: {err}")))?;
        }
        Ok(())
    }
}
