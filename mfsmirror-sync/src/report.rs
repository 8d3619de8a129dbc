//! Observable side effects of a run.

use std::fmt;

use mfsmirror_core::MfsPath;

/// One side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// New content was bound at the path.
    Published { path: MfsPath },
    /// The cached hash matched; the remote entry was left alone.
    Unchanged { path: MfsPath },
    /// A remote child with no local counterpart was removed.
    Deleted { path: MfsPath },
    /// A durable write or flush was requested for the path.
    Flushed { path: MfsPath },
    /// `--dry-run`: the file *would* have been published.
    WouldPublish { path: MfsPath },
    /// `--dry-run`: the remote child *would* have been removed.
    WouldDelete { path: MfsPath },
}

impl SyncEvent {
    /// Leading word of the log line.
    pub fn tag(&self) -> &'static str {
        match self {
            SyncEvent::Published { .. } => "FILE",
            SyncEvent::Unchanged { .. } => "SAME",
            SyncEvent::Deleted { .. } => "DELETE",
            SyncEvent::Flushed { .. } => "FLUSH",
            SyncEvent::WouldPublish { .. } => "WOULD-FILE",
            SyncEvent::WouldDelete { .. } => "WOULD-DELETE",
        }
    }

    pub fn path(&self) -> &MfsPath {
        match self {
            SyncEvent::Published { path }
            | SyncEvent::Unchanged { path }
            | SyncEvent::Deleted { path }
            | SyncEvent::Flushed { path }
            | SyncEvent::WouldPublish { path }
            | SyncEvent::WouldDelete { path } => path,
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag(), self.path())
    }
}

/// Everything a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub events: Vec<SyncEvent>,
}

impl SyncReport {
    /// Append an event and emit its log line.
    pub(crate) fn record(&mut self, event: SyncEvent) {
        tracing::info!("{event}");
        self.events.push(event);
    }

    fn count(&self, pred: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn published(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Published { .. } | SyncEvent::WouldPublish { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Unchanged { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Deleted { .. } | SyncEvent::WouldDelete { .. }))
    }

    pub fn flushed(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Flushed { .. }))
    }

    /// Paths with an event of the given tag, in order.
    pub fn paths_tagged(&self, tag: &str) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.tag() == tag)
            .map(|e| e.path().as_str())
            .collect()
    }
}
