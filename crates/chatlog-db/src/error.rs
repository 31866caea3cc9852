use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to bring the store up. The capture pipeline must not accept
/// events after one of these.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("failed to create database directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record store is already initialized")]
    AlreadyInitialized,

    #[error("record store has been shut down")]
    Closed,

    #[error("initialization task failed: {0}")]
    Task(String),
}

/// Failure of a single append. Recovered by the caller: the event is dropped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store is not initialized")]
    NotReady,

    #[error("record store has been shut down")]
    Closed,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("write cancelled before it reached the database")]
    Cancelled,

    #[error("write task failed: {0}")]
    Task(String),

    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}
