//! Storage error handling
//!
//! Provides typed errors for key-value and gateway operations with enough
//! context (operation, item ID, path) to log meaningfully.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ItemId;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open or create the store file
    #[error("Failed to open store '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store file is held by another handle
    #[error("Store '{path}' is locked by another process")]
    Locked { path: PathBuf },

    /// A bucket could not be created during initialization
    #[error("Failed to create bucket {name}")]
    BucketCreation { name: String },

    /// A bucket expected to exist is missing
    #[error("Bucket {name} does not exist")]
    BucketMissing { name: String },

    /// No item is stored under the given ID
    #[error("Item {id} not found")]
    NotFound { id: ItemId },

    /// Failed to encode or decode an item record
    #[error("Failed to serialize item {id} during {op}: {source}")]
    Serialization {
        op: &'static str,
        id: ItemId,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read an item record
    #[error("Failed to read item {id} during {op}: {source}")]
    Read {
        op: &'static str,
        id: ItemId,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to advance a bucket's sequence
    #[error("Failed to get next sequence for bucket {bucket} during {op}: {source}")]
    Sequence {
        op: &'static str,
        bucket: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to look up or scan a bucket
    #[error("Failed to access bucket {name} during {op}: {source}")]
    BucketAccess {
        op: &'static str,
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to write an item record
    #[error("Failed to write item {id} during {op}: {source}")]
    Write {
        op: &'static str,
        id: ItemId,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another connection holds the store lock
    #[error("Store is busy")]
    Busy,

    /// A write was attempted inside a read-only transaction
    #[error("Cannot modify the store inside a read-only transaction")]
    ReadOnly,

    /// The shared connection lock was poisoned by a panicking holder
    #[error("Store handle poisoned by a panicked operation")]
    Poisoned,

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Create an error from an I/O error with path context
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::Io(error),
        }
    }

    /// Classify a failure to open or initialize the store file
    ///
    /// A busy database at open time means another handle holds the lock.
    pub fn from_open(error: rusqlite::Error, path: PathBuf) -> Self {
        if is_busy(&error) {
            StorageError::Locked { path }
        } else {
            StorageError::Open {
                path,
                source: error,
            }
        }
    }

    /// Classify a SQLite error raised inside a transaction
    pub fn from_sqlite(error: rusqlite::Error) -> Self {
        if is_busy(&error) {
            return StorageError::Busy;
        }
        match error.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ReadOnly) => StorageError::ReadOnly,
            _ => StorageError::Database(error),
        }
    }

    /// Check if this error means the requested item does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Check if a SQLite error reports a busy or locked database
pub(crate) fn is_busy(error: &rusqlite::Error) -> bool {
    matches!(
        error.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
