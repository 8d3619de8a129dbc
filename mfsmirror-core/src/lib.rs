//! mfsmirror core library — domain types, the MFS API seam, configuration.
//!
//! - [`types`] — [`MfsPath`], [`ContentHash`], [`FlushDepth`], listings
//! - [`api`] — the [`MfsApi`] trait implemented by remote clients
//! - [`config`] — `config.yaml` loading and API endpoint discovery
//! - [`memory`] — [`MemoryMfs`], an in-process tree for tests and offline use
//! - [`error`] — [`RemoteError`], [`ConfigError`], [`PathError`]

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod types;

pub use api::MfsApi;
pub use config::{CacheBackend, Config};
pub use error::{ConfigError, PathError, RemoteError};
pub use memory::{MemoryMfs, MfsCall};
pub use types::{AddOptions, ContentHash, EntryKind, FlushDepth, MfsPath, RemoteEntry};
