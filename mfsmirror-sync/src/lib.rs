//! # mfsmirror-sync
//!
//! Mirror a local directory tree into an MFS directory.
//!
//! Call [`synchronize`] (or build a [`Synchronizer`]) with an
//! [`MfsApi`](mfsmirror_core::MfsApi) and a [`HashCache`]. Files whose
//! content hash matches the cache are left untouched; remote entries with no
//! local counterpart are removed; directories within the flush depth are
//! flushed.

pub mod cache;
pub mod editor;
pub mod error;
pub mod publisher;
pub mod report;
pub mod synchronizer;

pub use cache::{HashCache, JsonCache, MemoryCache};
#[cfg(unix)]
pub use cache::XattrCache;
pub use error::{CacheError, RemoteOp, SyncError};
pub use publisher::{publish, PublishOutcome};
pub use report::{SyncEvent, SyncReport};
pub use synchronizer::{synchronize, SyncOptions, Synchronizer};
