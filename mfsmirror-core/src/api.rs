//! The remote surface the synchronizer drives: upload plus the MFS editor.

use std::io::Read;

use crate::error::RemoteError;
use crate::types::{AddOptions, ContentHash, MfsPath, RemoteEntry};

/// Content store and mutable tree, as exposed by an IPFS node.
///
/// Every call blocks until the node answers. `durable` maps to the node's
/// per-request flush flag.
pub trait MfsApi {
    /// Upload everything `content` yields and return its content address.
    /// Never pins. Implementations stream rather than buffer where they can.
    fn add(&self, content: &mut dyn Read, options: AddOptions)
        -> Result<ContentHash, RemoteError>;

    /// Create `path` and any missing ancestors; no-op when it already exists.
    fn mkdir_all(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError>;

    /// Delete the subtree at `path`. Fails with `NotFound` when absent.
    fn remove_recursive(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError>;

    /// Attach previously uploaded content at `path`.
    ///
    /// The parent directory must exist and `path` must be free.
    fn bind_content(
        &self,
        hash: &ContentHash,
        path: &MfsPath,
        durable: bool,
    ) -> Result<(), RemoteError>;

    /// Direct children of the directory at `path`, in no particular order.
    fn list_children(&self, path: &MfsPath) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Block until the subtree at `path` is persisted.
    fn flush(&self, path: &MfsPath) -> Result<(), RemoteError>;
}
