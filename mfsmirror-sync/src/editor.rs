//! Remote tree editing with error context and an explicit failure policy.
//!
//! Wraps an [`MfsApi`] so every failure comes back as
//! [`SyncError::Remote`] naming the operation and path, and so the choice
//! between tolerating a missing path and failing is made by the caller
//! through [`Tolerance`].

use std::io::Read;
use std::path::Path;

use mfsmirror_core::{AddOptions, ContentHash, MfsApi, MfsPath, RemoteEntry, RemoteError};

use crate::error::{RemoteOp, SyncError};

/// What a removal may ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance {
    /// Any failure aborts.
    MustSucceed,
    /// A missing path is fine; every other failure aborts.
    AllowMissing,
}

/// Structural operations on the remote tree.
///
/// Directory creation, removal and listing are always non-durable; only
/// [`bind`](Self::bind) and [`flush`](Self::flush) can force persistence.
#[derive(Clone, Copy)]
pub struct RemoteEditor<'a> {
    api: &'a dyn MfsApi,
}

fn remote(op: RemoteOp, path: impl ToString, source: RemoteError) -> SyncError {
    SyncError::Remote {
        op,
        path: path.to_string(),
        source,
    }
}

impl<'a> RemoteEditor<'a> {
    pub fn new(api: &'a dyn MfsApi) -> Self {
        Self { api }
    }

    /// Stream a local file's contents to the store.
    pub fn upload(
        &self,
        local: &Path,
        content: &mut dyn Read,
        options: AddOptions,
    ) -> Result<ContentHash, SyncError> {
        self.api
            .add(content, options)
            .map_err(|e| remote(RemoteOp::Add, local.display(), e))
    }

    pub fn mkdir_all(&self, path: &MfsPath) -> Result<(), SyncError> {
        self.api
            .mkdir_all(path, false)
            .map_err(|e| remote(RemoteOp::Mkdir, path, e))
    }

    /// Remove the subtree at `path`. Returns `false` when a missing path was
    /// tolerated.
    pub fn remove(&self, path: &MfsPath, tolerance: Tolerance) -> Result<bool, SyncError> {
        match self.api.remove_recursive(path, false) {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() && tolerance == Tolerance::AllowMissing => {
                tracing::debug!(%path, "nothing to remove");
                Ok(false)
            }
            Err(err) => Err(remote(RemoteOp::Remove, path, err)),
        }
    }

    pub fn bind(&self, hash: &ContentHash, path: &MfsPath, durable: bool) -> Result<(), SyncError> {
        self.api
            .bind_content(hash, path, durable)
            .map_err(|e| remote(RemoteOp::Copy, path, e))
    }

    pub fn list(&self, path: &MfsPath) -> Result<Vec<RemoteEntry>, SyncError> {
        self.api
            .list_children(path)
            .map_err(|e| remote(RemoteOp::List, path, e))
    }

    /// Like [`list`](Self::list), but a missing directory lists as empty.
    pub fn list_if_exists(&self, path: &MfsPath) -> Result<Vec<RemoteEntry>, SyncError> {
        match self.api.list_children(path) {
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            other => other.map_err(|e| remote(RemoteOp::List, path, e)),
        }
    }

    pub fn flush(&self, path: &MfsPath) -> Result<(), SyncError> {
        self.api
            .flush(path)
            .map_err(|e| remote(RemoteOp::Flush, path, e))
    }
}
