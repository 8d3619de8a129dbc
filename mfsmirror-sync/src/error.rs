//! Error types for mfsmirror-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use mfsmirror_core::RemoteError;

/// Remote operation named in [`SyncError::Remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Add,
    Mkdir,
    Remove,
    Copy,
    List,
    Flush,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteOp::Add => "add",
            RemoteOp::Mkdir => "mkdir -p",
            RemoteOp::Remove => "rm -r",
            RemoteOp::Copy => "cp",
            RemoteOp::List => "ls",
            RemoteOp::Flush => "flush",
        })
    }
}

/// All errors that can arise from a synchronization run.
///
/// Display strings carry only this level's context; the cause is exposed
/// through `source()` so callers can print the whole chain.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed.
    #[error("{op} {path:?}")]
    Remote {
        op: RemoteOp,
        path: String,
        #[source]
        source: RemoteError,
    },

    /// Local filesystem failure, with annotated path for context.
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the cached hash of a file failed.
    #[error("cache hash for {path}")]
    Cache {
        path: PathBuf,
        #[source]
        source: CacheError,
    },

    /// Writing the cache back at the end of the run failed.
    #[error("persist hash cache")]
    CachePersist(#[source] CacheError),

    /// Publishing one file failed.
    #[error("publish {local:?} -> {remote:?}")]
    Publish {
        local: PathBuf,
        remote: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("source is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// MFS paths are UTF-8; a local name that is not cannot be mirrored.
    #[error("file name is not valid UTF-8: {path:?}")]
    NonUtf8Name { path: PathBuf },
}

/// Failures of a [`HashCache`](crate::cache::HashCache) backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (JSON cache file).
    #[error("hash cache JSON error at {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A stored hash is not valid hex.
    #[error("corrupt cache entry for {key}")]
    Corrupt {
        key: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("the {0} cache backend is not supported on this platform")]
    Unsupported(&'static str),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn cache_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
