//! Per-poll lock registry.
//!
//! Vote insertion and contest resolution for the same poll must not
//! interleave, or a last-vote-triggers-resolution race could record two
//! winners. Operations on different polls run concurrently; operations
//! on the same poll are serialized. Tally reads take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Registry of per-poll mutexes.
#[derive(Clone, Default)]
pub struct PollLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl PollLocks {
    /// Create an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a specific poll.
    ///
    /// The caller holds the returned mutex for the duration of the
    /// write operation.
    pub async fn for_poll(&self, poll_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(poll_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of polls with a registered lock.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether no locks are registered.
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }

    /// Drop lock entries no longer held by any operation.
    pub async fn cleanup(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
