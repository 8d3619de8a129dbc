//! Domain types shared by the MFS client and the synchronizer.
//!
//! Remote paths are always [`MfsPath`]; local paths stay `PathBuf`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

// ---------------------------------------------------------------------------
// MfsPath
// ---------------------------------------------------------------------------

/// An absolute, `/`-separated path in the remote mutable filesystem.
///
/// Construction through [`MfsPath::parse`] guarantees a leading slash.
/// [`MfsPath::join`] extends the path by exactly one child name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MfsPath(String);

impl MfsPath {
    /// The MFS root, `/`.
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Validate and normalise an absolute MFS path.
    ///
    /// Repeated and trailing slashes are collapsed; `.` and `..` segments are
    /// rejected rather than resolved.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if !raw.starts_with('/') {
            return Err(PathError::NotAbsolute(raw.to_owned()));
        }
        let mut path = String::with_capacity(raw.len());
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(PathError::InvalidSegment(raw.to_owned()));
            }
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(path))
    }

    /// Append a single child name.
    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => None,
        }
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for MfsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ContentHash
// ---------------------------------------------------------------------------

/// Content address returned by the store after an upload.
///
/// Compared byte-for-byte against the cached value; never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// `/ipfs/<hash>`, the source argument for an MFS copy.
    pub fn ipfs_path(&self) -> String {
        format!("/ipfs/{}", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// FlushDepth
// ---------------------------------------------------------------------------

/// Remaining flush-eligible levels below the current directory.
///
/// Starts at the configured depth at the source root and drops by one per
/// level. Non-negative values request durable writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlushDepth(pub i64);

impl FlushDepth {
    pub const DEFAULT: u32 = 4;

    pub fn new(depth: u32) -> Self {
        Self(i64::from(depth))
    }

    /// Counter for the next level down.
    pub fn descend(self) -> Self {
        Self(self.0 - 1)
    }

    pub fn is_durable(self) -> bool {
        self.0 >= 0
    }
}

impl Default for FlushDepth {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for FlushDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Remote listing
// ---------------------------------------------------------------------------

/// Node kind in a remote directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub hash: Option<ContentHash>,
}

/// Options for an upload.
///
/// Uploads never request pinning; retention is left to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Compute the address without storing the bytes.
    pub only_hash: bool,
}
