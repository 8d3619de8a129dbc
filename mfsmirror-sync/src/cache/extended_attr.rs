//! Hash stored in an extended attribute of the file itself.

use std::path::Path;

use crate::error::{cache_io_err, CacheError};

use super::HashCache;

/// Attribute name; shared with other tools that mirror into MFS.
pub const XATTR_NAME: &str = "user.ipfs-hash";

/// Keeps each file's hash in its `user.ipfs-hash` attribute.
///
/// The value survives restarts and travels with the file wherever the
/// filesystem and copy tool preserve extended attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XattrCache;

impl HashCache for XattrCache {
    fn get(&self, file: &Path) -> Result<Option<Vec<u8>>, CacheError> {
        match xattr::get(file, XATTR_NAME) {
            Ok(value) => Ok(value),
            // An unreadable attribute only costs a re-publish.
            Err(err) => {
                tracing::debug!(path = %file.display(), error = %err, "no readable hash attribute");
                Ok(None)
            }
        }
    }

    fn set(&mut self, file: &Path, hash: &[u8]) -> Result<(), CacheError> {
        xattr::set(file, XATTR_NAME, hash).map_err(|e| cache_io_err(file, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_attribute_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "a").unwrap();
        assert_eq!(XattrCache.get(&file).unwrap(), None);
    }

    #[test]
    fn set_then_get_is_byte_exact() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "a").unwrap();

        let mut cache = XattrCache;
        if let Err(err) = cache.set(&file, b"Qm\x00bin") {
            eprintln!("skipping: filesystem rejects user xattrs: {err}");
            return;
        }
        assert_eq!(cache.get(&file).unwrap(), Some(b"Qm\x00bin".to_vec()));
    }

    #[test]
    fn set_on_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut cache = XattrCache;
        let err = cache.set(&tmp.path().join("gone"), b"Qm").unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }
}
