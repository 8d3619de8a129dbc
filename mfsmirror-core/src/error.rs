//! Error types for mfsmirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected MFS path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("MFS path must begin with a slash: {0:?}")]
    NotAbsolute(String),

    #[error("MFS path may not contain '.' or '..' segments: {0:?}")]
    InvalidSegment(String),
}

/// Failures reported by an [`MfsApi`](crate::api::MfsApi) implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The path does not exist in the remote tree.
    #[error("file does not exist: {path}")]
    NotFound { path: String },

    /// The API answered with an error message.
    #[error("api error: {message}")]
    Api { message: String },

    /// The request never produced an API answer (connection, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered but the body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
