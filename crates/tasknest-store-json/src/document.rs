//! Whole-document JSON reads and atomic replacement writes.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::JsonStoreError;

/// Read a document, or `None` when it does not exist yet.
pub fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, JsonStoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| JsonStoreError::Parse {
                path: path.to_path_buf(),
                source,
            }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Read a document, falling back to the empty value when it does not exist yet.
pub fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, JsonStoreError> {
    Ok(read_optional(path)?.unwrap_or_default())
}

fn staged<T: Serialize>(path: &Path, value: &T) -> Result<NamedTempFile, JsonStoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Replace the document in one rename.
pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), JsonStoreError> {
    staged(path, value)?.persist(path)?;
    Ok(())
}

/// Write the document only when none exists. Returns whether it was written.
pub fn write_new<T: Serialize>(path: &Path, value: &T) -> Result<bool, JsonStoreError> {
    match staged(path, value)?.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.into()),
    }
}
