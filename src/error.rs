use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Metadata store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Timed out after {timeout:?} waiting for the lock on {path}, is another instance running?")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("Metadata database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Could not decode metadata of post {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported metadata store version {found} in {path}")]
    Version { path: PathBuf, found: u32 },

    #[error("Could not encode metadata: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("No metadata for post {0}")]
    UnknownPost(String),
}

macro_rules! database_error {
    ($($err:ty),*) => {
        $(impl From<$err> for StoreError {
            fn from(e: $err) -> Self {
                StoreError::Database(e.into())
            }
        })*
    };
}

database_error!(redb::TransactionError, redb::TableError, redb::StorageError, redb::CommitError);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Error walking posts directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Error reading post {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
