//! Error types for syncstore operations.
//!
//! The store operations themselves never return these; they are surfaced by
//! constructors and config loading, and logged by the file queue.

use std::io;
use thiserror::Error;

/// Result type for syncstore operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while building or persisting a snapshot.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sync response is not a JSON object")]
    NotAnObject,

    #[error("Store identity must not be empty")]
    EmptyIdentity,

    #[error("Invalid store identity: {0}")]
    InvalidIdentity(String),

    #[error("Credentials do not provide a user identifier")]
    MissingUserId,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File queue has shut down")]
    QueueClosed,
}

impl StoreError {
    /// Check if this error means the snapshot simply does not exist.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
