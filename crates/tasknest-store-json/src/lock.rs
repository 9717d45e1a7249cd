//! Advisory lock on the data directory, shared by every handle and process.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

const LOCK_FILE: &str = ".lock";

/// Access mode used when acquiring the directory lock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Held lock on a data directory. Released when dropped.
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl DirectoryLock {
    /// Block until the lock on `root` is held in `mode`.
    pub fn acquire(root: &Path, mode: LockMode) -> io::Result<Self> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        match mode {
            LockMode::Shared => fs2::FileExt::lock_shared(&file)?,
            LockMode::Exclusive => fs2::FileExt::lock_exclusive(&file)?,
        }
        Ok(Self { file, path, mode })
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        if let Err(err) = fs2::FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), mode = ?self.mode, error = %err, "Failed to release data directory lock");
        }
    }
}
