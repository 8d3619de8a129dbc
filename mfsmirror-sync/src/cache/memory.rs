//! In-memory cache, for tests and for callers that keep state themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

use super::HashCache;

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, file: &Path) -> Option<&[u8]> {
        self.entries.get(file).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HashCache for MemoryCache {
    fn get(&self, file: &Path) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(file).cloned())
    }

    fn set(&mut self, file: &Path, hash: &[u8]) -> Result<(), CacheError> {
        self.entries.insert(file.to_path_buf(), hash.to_vec());
        Ok(())
    }
}
