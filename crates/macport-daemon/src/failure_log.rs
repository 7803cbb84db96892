//! Append-only log of hosts that were skipped or failed during a run

use anyhow::{Context, Result};
use macport_core::{FailureReporter, SkipReason};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Writes `Host: <name> <reason>` lines to a file
pub struct FailureLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FailureLog {
    /// Open for appending, creating the file and its directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening failure log {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureReporter for FailureLog {
    fn report(&self, hostname: &str, reason: &SkipReason) {
        warn!(host = %hostname, code = reason.code(), "{}", reason);

        let line = format!("Host: {} {}\n", hostname, reason);
        if let Err(e) = self.file.lock().write_all(line.as_bytes()) {
            error!(path = %self.path.display(), error = %e, "Failed to append to failure log");
        }
    }
}
