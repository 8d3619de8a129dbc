//! Hash cache kept in one JSON document.
//!
//! For filesystems without user extended attributes. Entries are keyed by
//! the file's path as the synchronizer sees it (absolute, canonical source
//! root) and hold the hex-encoded hash. Writes use an atomic `.tmp` + rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{cache_io_err, CacheError};

use super::{key_for, HashCache};

/// On-disk payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashCacheFile {
    pub synced_at: DateTime<Utc>,
    pub files: BTreeMap<String, String>,
}

/// JSON-file backed [`HashCache`]. Changes are buffered until
/// [`persist`](HashCache::persist).
#[derive(Debug)]
pub struct JsonCache {
    path: PathBuf,
    store: HashCacheFile,
    dirty: bool,
}

impl JsonCache {
    /// Load the cache at `path`. Returns an empty cache if the file does not
    /// yet exist.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let store = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| cache_io_err(path, e))?;
            serde_json::from_str(&contents).map_err(|source| CacheError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            HashCacheFile {
                synced_at: Utc::now(),
                files: BTreeMap::new(),
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            store,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &HashCacheFile {
        &self.store
    }
}

impl HashCache for JsonCache {
    fn get(&self, file: &Path) -> Result<Option<Vec<u8>>, CacheError> {
        let key = key_for(file);
        match self.store.files.get(&key) {
            Some(encoded) => hex::decode(encoded)
                .map(Some)
                .map_err(|source| CacheError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    fn set(&mut self, file: &Path, hash: &[u8]) -> Result<(), CacheError> {
        self.store.files.insert(key_for(file), hex::encode(hash));
        self.dirty = true;
        Ok(())
    }

    /// Write to `<path>.tmp` then rename to `<path>`. No-op when nothing
    /// changed since the last load or persist.
    fn persist(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| cache_io_err(dir, e))?;
        }

        self.store.synced_at = Utc::now();
        let json = serde_json::to_string_pretty(&self.store).map_err(|source| CacheError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| cache_io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(cache_io_err(&self.path, e));
        }
        self.dirty = false;
        Ok(())
    }
}
