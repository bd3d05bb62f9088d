use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;

/// Identifies one outstanding commit. Issued in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitTicket(pub u64);

impl std::fmt::Display for CommitTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why the store's snapshot was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceCause {
    /// Authoritative fetch from the backend.
    Fetched,
    /// Local reorder applied ahead of the backend.
    Optimistic,
    /// Pre-mutation snapshot restored after a failed commit.
    Reverted,
}

impl ReplaceCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Optimistic => "optimistic",
            Self::Reverted => "reverted",
        }
    }
}

impl std::fmt::Display for ReplaceCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holder of the snapshot a board displays.
///
/// Any cache can back this; the board only reads the current snapshot,
/// replaces it wholesale, and parks pre-mutation snapshots per commit.
pub trait SnapshotStore: Send + Sync {
    fn current(&self) -> Snapshot;

    /// Swap in `snapshot` and return the new version.
    fn replace(&self, snapshot: Snapshot, cause: ReplaceCause) -> u64;

    /// Bumped by every `replace`.
    fn version(&self) -> u64;

    fn stash_prior(&self, ticket: CommitTicket, prior: Snapshot);

    /// Get-and-clear the snapshot parked for `ticket`.
    fn take_prior(&self, ticket: CommitTicket) -> Option<Snapshot>;
}

#[derive(Default)]
struct Inner {
    snapshot: Snapshot,
    version: u64,
    priors: HashMap<CommitTicket, Snapshot>,
}

/// Mutex-backed store used by default.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<Inner>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                ..Inner::default()
            }),
        }
    }

    /// Number of commits whose prior snapshot is still parked.
    pub fn pending_priors(&self) -> usize {
        self.lock().priors.len()
    }

    // Every critical section leaves `Inner` consistent, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn current(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    fn replace(&self, snapshot: Snapshot, cause: ReplaceCause) -> u64 {
        let mut inner = self.lock();
        inner.snapshot = snapshot;
        inner.version += 1;
        tracing::trace!(version = inner.version, %cause, "snapshot replaced");
        inner.version
    }

    fn version(&self) -> u64 {
        self.lock().version
    }

    fn stash_prior(&self, ticket: CommitTicket, prior: Snapshot) {
        self.lock().priors.insert(ticket, prior);
    }

    fn take_prior(&self, ticket: CommitTicket) -> Option<Snapshot> {
        self.lock().priors.remove(&ticket)
    }
}
