//! Tree synchronizer: make an MFS directory mirror a local directory.
//!
//! Per directory, depth-first and strictly sequential:
//!
//! 1. List the local children (directories and regular files only).
//! 2. Remove remote files standing where a local subdirectory now is, then
//!    recurse into every subdirectory with the flush counter decremented.
//! 3. A directory holding only files gets `mkdir -p` so files have a parent.
//! 4. Publish every file with the decremented counter.
//! 5. Reconcile: an empty directory is removed and recreated; otherwise every
//!    remote child with no local counterpart is removed.
//! 6. Flush the directory while the counter is non-negative.
//!
//! The first failure aborts the whole run. Nothing is rolled back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mfsmirror_core::{EntryKind, FlushDepth, MfsApi, MfsPath, RemoteEntry};

use crate::cache::HashCache;
use crate::editor::{RemoteEditor, Tolerance};
use crate::error::{io_err, SyncError};
use crate::publisher::{publish, PublishOutcome};
use crate::report::{SyncEvent, SyncReport};

/// Run-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Levels below the source root, inclusive, whose directories are flushed.
    pub flush_depth: u32,
    /// Report what would change without mutating the tree or the cache.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            flush_depth: FlushDepth::DEFAULT,
            dry_run: false,
        }
    }
}

/// Immediate children of a local directory, sorted by name.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SourceListing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

impl SourceListing {
    fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Partition `dir`'s entries. Symlinks, sockets, devices and fifos are
/// neither directories nor regular files and are skipped.
pub(crate) fn read_source_dir(dir: &Path) -> Result<SourceListing, SyncError> {
    let mut listing = SourceListing::default();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        if !file_type.is_dir() && !file_type.is_file() {
            tracing::debug!(path = %entry.path().display(), "skipping non-regular entry");
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| SyncError::NonUtf8Name { path: entry.path() })?;
        if file_type.is_dir() {
            listing.dirs.push(name);
        } else {
            listing.files.push(name);
        }
    }
    listing.dirs.sort();
    listing.files.sort();
    Ok(listing)
}

/// Mirrors one local tree into MFS.
pub struct Synchronizer<'a> {
    editor: RemoteEditor<'a>,
    cache: &'a mut dyn HashCache,
    options: SyncOptions,
    report: SyncReport,
    /// Remote files a dry run reported as deleted to make room for a directory.
    displaced: HashSet<MfsPath>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(api: &'a dyn MfsApi, cache: &'a mut dyn HashCache, options: SyncOptions) -> Self {
        Self {
            editor: RemoteEditor::new(api),
            cache,
            options,
            report: SyncReport::default(),
            displaced: HashSet::new(),
        }
    }

    /// Mirror `source` into `dest` and persist the cache.
    ///
    /// The cache is persisted even when the run fails part-way, so files
    /// published before the failure are not re-bound next time.
    pub fn run(mut self, source: &Path, dest: &MfsPath) -> Result<SyncReport, SyncError> {
        let source = resolve_source(source)?;
        tracing::debug!(
            source = %source.display(),
            %dest,
            flush_depth = self.options.flush_depth,
            dry_run = self.options.dry_run,
            "starting sync"
        );

        let result = self.sync_root(&source, dest);
        let persisted = if self.options.dry_run {
            Ok(())
        } else {
            self.cache.persist()
        };

        match (result, persisted) {
            (Ok(()), Ok(())) => Ok(self.report),
            (Ok(()), Err(err)) => Err(SyncError::CachePersist(err)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(persist_err)) => {
                tracing::warn!(error = %persist_err, "could not persist hash cache after failure");
                Err(err)
            }
        }
    }

    fn sync_root(&mut self, source: &Path, dest: &MfsPath) -> Result<(), SyncError> {
        if let Some(parent) = dest.parent() {
            self.displace_files(&parent, &[dest.name()])?;
        }
        self.sync_dir(source, dest, FlushDepth::new(self.options.flush_depth))
    }

    fn sync_dir(&mut self, src: &Path, dest: &MfsPath, depth: FlushDepth) -> Result<(), SyncError> {
        let listing = read_source_dir(src)?;
        let mut expected: HashSet<&str> = HashSet::new();

        if !listing.dirs.is_empty() {
            let names: Vec<&str> = listing.dirs.iter().map(String::as_str).collect();
            self.displace_files(dest, &names)?;
        }
        for name in &listing.dirs {
            self.sync_dir(&src.join(name), &dest.join(name), depth.descend())?;
            expected.insert(name.as_str());
        }

        if listing.dirs.is_empty() && !listing.files.is_empty() && !self.options.dry_run {
            self.editor.mkdir_all(dest)?;
        }

        for name in &listing.files {
            self.publish_file(&src.join(name), &dest.join(name), depth.descend())?;
            expected.insert(name.as_str());
        }

        if listing.is_empty() {
            self.remake_dir(dest)?;
        } else {
            self.prune(dest, &expected)?;
        }

        if depth.is_durable() && !self.options.dry_run {
            self.editor.flush(dest)?;
            self.report.record(SyncEvent::Flushed { path: dest.clone() });
        }
        Ok(())
    }

    fn publish_file(
        &mut self,
        local: &Path,
        remote: &MfsPath,
        depth: FlushDepth,
    ) -> Result<(), SyncError> {
        let outcome = publish(
            self.editor,
            &mut *self.cache,
            local,
            remote,
            depth,
            self.options.dry_run,
        )?;
        let path = remote.clone();
        match outcome {
            PublishOutcome::Unchanged { .. } => self.report.record(SyncEvent::Unchanged { path }),
            PublishOutcome::WouldPublish { .. } => {
                self.report.record(SyncEvent::WouldPublish { path })
            }
            PublishOutcome::Published { durable, .. } => {
                self.report.record(SyncEvent::Published { path: path.clone() });
                if durable {
                    self.report.record(SyncEvent::Flushed { path });
                }
            }
        }
        Ok(())
    }

    /// Leave `dest` as an existing, empty directory.
    fn remake_dir(&mut self, dest: &MfsPath) -> Result<(), SyncError> {
        if self.options.dry_run {
            let stale = self.planned_children(dest)?;
            return self.delete_children(dest, stale);
        }
        if dest.is_root() {
            // The root itself cannot be removed; empty it instead.
            let stale = self.editor.list(dest)?;
            return self.delete_children(dest, stale);
        }
        self.editor.remove(dest, Tolerance::AllowMissing)?;
        self.editor.mkdir_all(dest)
    }

    /// Remove remote children of `dest` not in `expected`.
    fn prune(&mut self, dest: &MfsPath, expected: &HashSet<&str>) -> Result<(), SyncError> {
        let existing = if self.options.dry_run {
            self.planned_children(dest)?
        } else {
            self.editor.list(dest)?
        };
        let orphans = existing
            .into_iter()
            .filter(|entry| !expected.contains(entry.name.as_str()))
            .collect();
        self.delete_children(dest, orphans)
    }

    /// Remove each remote file under `parent` whose name is in `dirs`, so
    /// the directory of that name can be created.
    fn displace_files(&mut self, parent: &MfsPath, dirs: &[&str]) -> Result<(), SyncError> {
        let mut blocking: Vec<RemoteEntry> = self
            .planned_children(parent)?
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::File && dirs.contains(&entry.name.as_str()))
            .collect();
        blocking.sort_by(|a, b| a.name.cmp(&b.name));
        for entry in blocking {
            let path = parent.join(&entry.name);
            tracing::debug!(%path, "remote file replaced by a directory");
            if self.options.dry_run {
                self.displaced.insert(path.clone());
                self.report.record(SyncEvent::WouldDelete { path });
            } else {
                self.editor.remove(&path, Tolerance::MustSucceed)?;
                self.report.record(SyncEvent::Deleted { path });
            }
        }
        Ok(())
    }

    /// Remote children of `dest` as this run would leave them before
    /// reconciling. A missing directory has none. In a dry run, so does
    /// anything below a file reported as displaced.
    fn planned_children(&self, dest: &MfsPath) -> Result<Vec<RemoteEntry>, SyncError> {
        let mut cursor = Some(dest.clone());
        while let Some(path) = cursor {
            if self.displaced.contains(&path) {
                return Ok(Vec::new());
            }
            cursor = path.parent();
        }
        self.editor.list_if_exists(dest)
    }

    fn delete_children(
        &mut self,
        dest: &MfsPath,
        mut children: Vec<RemoteEntry>,
    ) -> Result<(), SyncError> {
        children.sort_by(|a, b| a.name.cmp(&b.name));
        for child in children {
            let path = dest.join(&child.name);
            if self.options.dry_run {
                self.report.record(SyncEvent::WouldDelete { path });
            } else {
                self.editor.remove(&path, Tolerance::MustSucceed)?;
                self.report.record(SyncEvent::Deleted { path });
            }
        }
        Ok(())
    }
}

fn resolve_source(source: &Path) -> Result<PathBuf, SyncError> {
    let meta = std::fs::metadata(source).map_err(|e| io_err(source, e))?;
    if !meta.is_dir() {
        return Err(SyncError::NotADirectory {
            path: source.to_path_buf(),
        });
    }
    std::fs::canonicalize(source).map_err(|e| io_err(source, e))
}

/// Mirror `source` into `dest` with `cache` as the hash cache.
pub fn synchronize<'a>(
    api: &'a dyn MfsApi,
    cache: &'a mut dyn HashCache,
    source: &Path,
    dest: &MfsPath,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    Synchronizer::new(api, cache, options).run(source, dest)
}
