//! In-process [`MfsApi`] implementation.
//!
//! Models the subset of MFS semantics the synchronizer relies on: `mkdir -p`
//! is idempotent, `rm -r` of a missing path fails with `NotFound`, `cp`
//! requires an existing parent and a free target. Every call is recorded so
//! callers can assert on the exact request sequence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::api::MfsApi;
use crate::error::RemoteError;
use crate::types::{AddOptions, ContentHash, EntryKind, MfsPath, RemoteEntry};

/// One recorded request against a [`MemoryMfs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfsCall {
    Add { only_hash: bool },
    Mkdir { path: MfsPath, durable: bool },
    Remove { path: MfsPath, durable: bool },
    Copy { hash: ContentHash, path: MfsPath, durable: bool },
    List { path: MfsPath },
    Flush { path: MfsPath },
}

impl MfsCall {
    /// Whether the call can change the tree.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            MfsCall::Mkdir { .. } | MfsCall::Remove { .. } | MfsCall::Copy { .. }
        )
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(ContentHash),
}

#[derive(Debug)]
struct Fault {
    op: &'static str,
    path: Option<MfsPath>,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<MfsPath, Node>,
    blobs: HashMap<ContentHash, Vec<u8>>,
    calls: Vec<MfsCall>,
    faults: Vec<Fault>,
}

impl State {
    fn check_fault(&self, op: &str, path: Option<&MfsPath>) -> Result<(), RemoteError> {
        let hit = self
            .faults
            .iter()
            .find(|f| f.op == op && (f.path.is_none() || f.path.as_ref() == path));
        match hit {
            Some(fault) => Err(RemoteError::Api {
                message: fault.message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn children_of(&self, dir: &MfsPath) -> impl Iterator<Item = (&MfsPath, &Node)> + '_ {
        let dir = dir.clone();
        self.nodes
            .iter()
            .filter(move |(p, _)| p.parent().as_ref() == Some(&dir))
    }

    fn is_within(path: &MfsPath, root: &MfsPath) -> bool {
        path == root || path.as_str().starts_with(&format!("{}/", root.as_str()))
    }
}

/// Thread-safe in-memory mutable tree with a content store.
#[derive(Debug)]
pub struct MemoryMfs {
    state: Mutex<State>,
}

impl Default for MemoryMfs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMfs {
    /// An empty tree containing only `/`.
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert(MfsPath::root(), Node::Dir);
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Content address used by this store: hex SHA-256 with a `sha256-` tag.
    pub fn hash_of(bytes: &[u8]) -> ContentHash {
        ContentHash(format!("sha256-{}", hex::encode(Sha256::digest(bytes))))
    }

    /// Place a file directly, creating parents, without recording a call.
    pub fn seed_file(&self, path: &MfsPath, bytes: &[u8]) {
        let hash = Self::hash_of(bytes);
        let mut state = self.lock();
        let mut cursor = path.parent();
        while let Some(dir) = cursor {
            state.nodes.entry(dir.clone()).or_insert(Node::Dir);
            cursor = dir.parent();
        }
        state.blobs.insert(hash.clone(), bytes.to_vec());
        state.nodes.insert(path.clone(), Node::File(hash));
    }

    /// Create a directory directly, with parents, without recording a call.
    pub fn seed_dir(&self, path: &MfsPath) {
        let mut state = self.lock();
        let mut cursor = Some(path.clone());
        while let Some(dir) = cursor {
            state.nodes.entry(dir.clone()).or_insert(Node::Dir);
            cursor = dir.parent();
        }
    }

    /// Make every later `op` call (optionally only at `path`) fail.
    ///
    /// `op` is one of `add`, `mkdir`, `rm`, `cp`, `ls`, `flush`.
    pub fn inject_failure(&self, op: &'static str, path: Option<MfsPath>, message: &str) {
        self.lock().faults.push(Fault {
            op,
            path,
            message: message.to_owned(),
        });
    }

    pub fn calls(&self) -> Vec<MfsCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn exists(&self, path: &MfsPath) -> bool {
        self.lock().nodes.contains_key(path)
    }

    pub fn is_dir(&self, path: &MfsPath) -> bool {
        matches!(self.lock().nodes.get(path), Some(Node::Dir))
    }

    /// Hash bound at `path`, if it is a file.
    pub fn file_hash(&self, path: &MfsPath) -> Option<ContentHash> {
        match self.lock().nodes.get(path) {
            Some(Node::File(hash)) => Some(hash.clone()),
            _ => None,
        }
    }

    /// Bytes of the file at `path`.
    pub fn read_file(&self, path: &MfsPath) -> Option<Vec<u8>> {
        let state = self.lock();
        match state.nodes.get(path) {
            Some(Node::File(hash)) => state.blobs.get(hash).cloned(),
            _ => None,
        }
    }

    /// Child names of the directory at `path`.
    pub fn child_names(&self, path: &MfsPath) -> Option<BTreeSet<String>> {
        let state = self.lock();
        match state.nodes.get(path) {
            Some(Node::Dir) => Some(
                state
                    .children_of(path)
                    .map(|(p, _)| p.name().to_owned())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Every path in the tree, sorted.
    pub fn paths(&self) -> Vec<MfsPath> {
        self.lock().nodes.keys().cloned().collect()
    }
}

impl MfsApi for MemoryMfs {
    fn add(
        &self,
        content: &mut dyn Read,
        options: AddOptions,
    ) -> Result<ContentHash, RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::Add {
            only_hash: options.only_hash,
        });
        state.check_fault("add", None)?;
        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let hash = Self::hash_of(&bytes);
        if !options.only_hash {
            state.blobs.insert(hash.clone(), bytes);
        }
        Ok(hash)
    }

    fn mkdir_all(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::Mkdir {
            path: path.clone(),
            durable,
        });
        state.check_fault("mkdir", Some(path))?;

        let mut chain = Vec::new();
        let mut cursor = Some(path.clone());
        while let Some(dir) = cursor {
            cursor = dir.parent();
            chain.push(dir);
        }
        for dir in chain.into_iter().rev() {
            let existing = state.nodes.get(&dir).cloned();
            match existing {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => {
                    return Err(RemoteError::Api {
                        message: format!("{dir} is not a directory"),
                    })
                }
                None => {
                    state.nodes.insert(dir, Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn remove_recursive(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::Remove {
            path: path.clone(),
            durable,
        });
        state.check_fault("rm", Some(path))?;

        if path.is_root() {
            return Err(RemoteError::Api {
                message: "cannot remove root".to_owned(),
            });
        }
        if !state.nodes.contains_key(path) {
            return Err(RemoteError::NotFound {
                path: path.to_string(),
            });
        }
        state.nodes.retain(|p, _| !State::is_within(p, path));
        Ok(())
    }

    fn bind_content(
        &self,
        hash: &ContentHash,
        path: &MfsPath,
        durable: bool,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::Copy {
            hash: hash.clone(),
            path: path.clone(),
            durable,
        });
        state.check_fault("cp", Some(path))?;

        if !state.blobs.contains_key(hash) {
            return Err(RemoteError::Api {
                message: format!("block not found: {hash}"),
            });
        }
        let parent = path.parent().ok_or_else(|| RemoteError::Api {
            message: "cannot copy onto root".to_owned(),
        })?;
        match state.nodes.get(&parent) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(RemoteError::Api {
                    message: format!("{parent} is not a directory"),
                })
            }
            None => {
                return Err(RemoteError::NotFound {
                    path: parent.to_string(),
                })
            }
        }
        if state.nodes.contains_key(path) {
            return Err(RemoteError::Api {
                message: "directory already has entry by that name".to_owned(),
            });
        }
        state.nodes.insert(path.clone(), Node::File(hash.clone()));
        Ok(())
    }

    fn list_children(&self, path: &MfsPath) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::List { path: path.clone() });
        state.check_fault("ls", Some(path))?;

        let to_entry = |name: &str, node: &Node, blobs: &HashMap<ContentHash, Vec<u8>>| match node
        {
            Node::Dir => RemoteEntry {
                name: name.to_owned(),
                kind: EntryKind::Directory,
                size: 0,
                hash: None,
            },
            Node::File(hash) => RemoteEntry {
                name: name.to_owned(),
                kind: EntryKind::File,
                size: blobs.get(hash).map_or(0, |b| b.len() as u64),
                hash: Some(hash.clone()),
            },
        };

        match state.nodes.get(path) {
            None => Err(RemoteError::NotFound {
                path: path.to_string(),
            }),
            Some(file @ Node::File(_)) => Ok(vec![to_entry(path.name(), file, &state.blobs)]),
            Some(Node::Dir) => Ok(state
                .children_of(path)
                .map(|(p, node)| to_entry(p.name(), node, &state.blobs))
                .collect()),
        }
    }

    fn flush(&self, path: &MfsPath) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(MfsCall::Flush { path: path.clone() });
        state.check_fault("flush", Some(path))?;
        if !state.nodes.contains_key(path) {
            return Err(RemoteError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}
