//! Error types for JSON document store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during `JsonStore` and `LocalIdentity` operations.
#[derive(Error, Debug)]
pub enum JsonStoreError {
    /// Task was not found in the store.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Profile was not found in the store.
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Document could not be parsed.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Offending document.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// Document could not be serialized.
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to move a written document into place.
    #[error("Failed to persist document: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
