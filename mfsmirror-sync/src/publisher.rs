//! Content publisher: one local file to one MFS path.
//!
//! ## `publish` — 5-step protocol
//!
//! 1. Open the file.
//! 2. Stream it to the store (never pinned) and receive the content hash.
//! 3. Compare with the cached hash → skip if byte-identical.
//! 4. Remove whatever is at the remote path (a missing path is fine), then
//!    bind the new hash there; the copy is durable inside the flush horizon.
//! 5. Store the new hash in the cache.

use std::fs::File;
use std::path::Path;

use mfsmirror_core::{AddOptions, ContentHash, FlushDepth, MfsPath};

use crate::cache::HashCache;
use crate::editor::{RemoteEditor, Tolerance};
use crate::error::{io_err, SyncError};

/// Outcome of publishing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// New content was bound; `durable` when the copy forced persistence.
    Published { hash: ContentHash, durable: bool },
    /// Cached hash matched; nothing was written.
    Unchanged { hash: ContentHash },
    /// Dry run: content differs from the cache and would be bound.
    WouldPublish { hash: ContentHash },
}

/// Publish `local` at `remote`.
///
/// `depth` is the counter for the file itself (its directory's counter minus
/// one). With `dry_run`, the hash is computed by the node without storing the
/// bytes and neither the remote tree nor the cache is touched.
pub fn publish(
    editor: RemoteEditor<'_>,
    cache: &mut dyn HashCache,
    local: &Path,
    remote: &MfsPath,
    depth: FlushDepth,
    dry_run: bool,
) -> Result<PublishOutcome, SyncError> {
    publish_steps(editor, cache, local, remote, depth, dry_run).map_err(|source| {
        SyncError::Publish {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            source: Box::new(source),
        }
    })
}

fn publish_steps(
    editor: RemoteEditor<'_>,
    cache: &mut dyn HashCache,
    local: &Path,
    remote: &MfsPath,
    depth: FlushDepth,
    dry_run: bool,
) -> Result<PublishOutcome, SyncError> {
    // Steps 1-2: open and upload.
    let mut file = File::open(local).map_err(|e| io_err(local, e))?;
    let hash = editor.upload(local, &mut file, AddOptions { only_hash: dry_run })?;

    // Step 3: compare with the cached hash.
    let cached = cache.get(local).map_err(|source| SyncError::Cache {
        path: local.to_path_buf(),
        source,
    })?;
    if cached.as_deref() == Some(hash.as_bytes()) {
        return Ok(PublishOutcome::Unchanged { hash });
    }

    if dry_run {
        return Ok(PublishOutcome::WouldPublish { hash });
    }

    // Step 4: replace the remote entry.
    editor.remove(remote, Tolerance::AllowMissing)?;
    let durable = depth.is_durable();
    editor.bind(&hash, remote, durable)?;

    // Step 5: remember what was published.
    cache
        .set(local, hash.as_bytes())
        .map_err(|source| SyncError::Cache {
            path: local.to_path_buf(),
            source,
        })?;

    Ok(PublishOutcome::Published { hash, durable })
}
