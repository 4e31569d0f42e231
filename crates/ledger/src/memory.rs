//! In-process ledger store with true compare-and-swap.
//!
//! Backs the ledger in tests. An optional read delay holds every `get`
//! after the read so concurrent writers observe the same revision.

use async_trait::async_trait;
use bourse_tracker_core::{LedgerStore, PutOutcome, Revision, StoreError, Versioned};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, (String, u64)>>,
    read_delay: Duration,
    writes: AtomicUsize,
    conflicts: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every read after the content has been captured.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Seeds a document at revision 1.
    #[must_use]
    pub fn with_document(self, key: &str, content: &str) -> Self {
        self.docs
            .lock()
            .insert(key.to_string(), (content.to_string(), 1));
        self
    }

    /// Current content of a key.
    #[must_use]
    pub fn content(&self, key: &str) -> Option<String> {
        self.docs.lock().get(key).map(|(content, _)| content.clone())
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of rejected writes.
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }
}

fn revision_of(version: u64) -> Revision {
    Revision::new(version.to_string())
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Versioned, StoreError> {
        let versioned = match self.docs.lock().get(key) {
            Some((content, version)) => Versioned {
                content: Some(content.clone()),
                revision: Some(revision_of(*version)),
            },
            None => Versioned::default(),
        };
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        Ok(versioned)
    }

    async fn put(
        &self,
        key: &str,
        content: &str,
        expected: Option<&Revision>,
    ) -> Result<PutOutcome, StoreError> {
        let mut docs = self.docs.lock();
        let current = docs.get(key).map(|(_, version)| revision_of(*version));
        if current.as_ref() != expected {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
            return Ok(PutOutcome::Conflict);
        }
        let next = docs.get(key).map_or(1, |(_, version)| version + 1);
        docs.insert(key.to_string(), (content.to_string(), next));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(PutOutcome::Written(revision_of(next)))
    }
}
