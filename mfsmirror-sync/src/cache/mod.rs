//! Last-published hash per local file.
//!
//! The synchronizer hands a `&mut dyn HashCache` to the publisher; nothing
//! about the cache is global.

use std::path::Path;

use mfsmirror_core::CacheBackend;

use crate::error::CacheError;

mod json;
mod memory;
#[cfg(unix)]
mod extended_attr;

pub use json::{HashCacheFile, JsonCache};
pub use memory::MemoryCache;
#[cfg(unix)]
pub use extended_attr::{XattrCache, XATTR_NAME};

/// Key/value association between a local file and the hash it was last
/// published under. Values are compared byte-for-byte.
pub trait HashCache {
    /// Cached hash for `file`, or `None` when there is none.
    fn get(&self, file: &Path) -> Result<Option<Vec<u8>>, CacheError>;

    /// Remember `hash` for `file`.
    fn set(&mut self, file: &Path, hash: &[u8]) -> Result<(), CacheError>;

    /// Write buffered entries to durable storage. Called once per run.
    fn persist(&mut self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Open the configured backend. `cache_file` is only used by [`JsonCache`].
pub fn open(backend: CacheBackend, cache_file: &Path) -> Result<Box<dyn HashCache>, CacheError> {
    match backend {
        CacheBackend::Json => Ok(Box::new(JsonCache::open(cache_file)?)),
        CacheBackend::Xattr => open_xattr(),
    }
}

#[cfg(unix)]
fn open_xattr() -> Result<Box<dyn HashCache>, CacheError> {
    Ok(Box::new(XattrCache))
}

#[cfg(not(unix))]
fn open_xattr() -> Result<Box<dyn HashCache>, CacheError> {
    Err(CacheError::Unsupported("xattr"))
}

/// Key under which a file is stored by path-keyed backends.
pub(crate) fn key_for(file: &Path) -> String {
    file.to_string_lossy().into_owned()
}

