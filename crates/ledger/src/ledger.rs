//! Cross-run deduplication ledger.
//!
//! Reads are served from a short-lived local cache. Every write goes through
//! [`DedupLedger::update`]: load the current document bypassing the cache,
//! apply the mutation, prune old day partitions and write it back
//! conditionally on the revision that was read. A conflict reloads and
//! re-applies the mutation, so entries another writer added in between are
//! kept and never duplicated.

use crate::document::{DayStats, LedgerDocument};
use crate::error::{LedgerError, Result};
use bourse_tracker_core::{
    DayKey, LedgerConfig, LedgerEntry, LedgerStore, PutOutcome, Revision, StoreError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ledger tuning, usually taken from [`LedgerConfig`].
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Document key in the store.
    pub key: String,
    pub retention_days: usize,
    pub cache_ttl: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl From<&LedgerConfig> for LedgerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            key: config.file_name.clone(),
            retention_days: config.retention_days,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            max_attempts: config.max_commit_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// Result of a successful [`DedupLedger::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// New entries were written.
    Written { added: usize, attempts: u32 },
    /// Every entry was already recorded; nothing was written.
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateOutcome {
    Written { changed: usize, attempts: u32 },
    Unchanged,
}

#[derive(Debug)]
struct CachedDocument {
    doc: LedgerDocument,
    fetched_at: Instant,
}

pub struct DedupLedger {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
    cache: Mutex<Option<CachedDocument>>,
    /// Serializes this process's own writers. Other processes are handled
    /// by the conditional write.
    write_lock: tokio::sync::Mutex<()>,
    conflicts: AtomicUsize,
}

impl DedupLedger {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self {
            store,
            settings,
            cache: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
            conflicts: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Write conflicts observed so far.
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::Relaxed)
    }

    /// Loads the document into the cache.
    ///
    /// # Errors
    ///
    /// Returns the store error if the document cannot be read at all.
    pub async fn warm(&self) -> Result<()> {
        self.reload().await?;
        Ok(())
    }

    /// Whether `entry` was already delivered on `day`.
    ///
    /// Answers from the cache while it is fresh. On a miss the document is
    /// reloaded; if that fails a stale cached copy is used when one exists.
    ///
    /// # Errors
    ///
    /// Returns the store error when the document cannot be loaded and
    /// nothing is cached.
    pub async fn already_sent(&self, day: &DayKey, entry: &LedgerEntry) -> Result<bool> {
        if let Some(sent) = self.read_cache(true, |doc| doc.contains(day, entry)) {
            return Ok(sent);
        }
        match self.reload().await {
            Ok(()) => Ok(self
                .read_cache(false, |doc| doc.contains(day, entry))
                .unwrap_or(false)),
            Err(e) => match self.read_cache(false, |doc| doc.contains(day, entry)) {
                Some(sent) => {
                    warn!(error = %e, entry = %entry, "Ledger reload failed, answering from stale cache");
                    Ok(sent)
                }
                None => Err(e),
            },
        }
    }

    /// Records delivered entries for `day`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RetriesExhausted`] when conflicts or transient
    /// failures outlast every attempt, or the first permanent store error.
    /// Either way the entries must be assumed unrecorded.
    pub async fn commit(&self, day: &DayKey, entries: &[LedgerEntry]) -> Result<CommitOutcome> {
        let outcome = self
            .update("commit", |doc| doc.insert_all(day, entries))
            .await?;
        Ok(match outcome {
            UpdateOutcome::Written { changed, attempts } => {
                info!(day = %day, added = changed, attempts, "Ledger entries committed");
                CommitOutcome::Written {
                    added: changed,
                    attempts,
                }
            }
            UpdateOutcome::Unchanged => {
                debug!(day = %day, "All entries already recorded");
                CommitOutcome::AlreadyPresent
            }
        })
    }

    /// Whether the daily summary for `day` has been delivered.
    ///
    /// Always reads the current document.
    ///
    /// # Errors
    ///
    /// Returns the store error if the document cannot be read.
    pub async fn is_daily_gate_set(&self, day: &DayKey) -> Result<bool> {
        self.reload().await?;
        Ok(self
            .read_cache(false, |doc| doc.is_gate_set(day))
            .unwrap_or(false))
    }

    /// Sets the daily summary gate. Returns `false` if it was already set.
    ///
    /// # Errors
    ///
    /// Same as [`DedupLedger::commit`].
    pub async fn set_daily_gate(&self, day: &DayKey) -> Result<bool> {
        let outcome = self.update("daily_gate", |doc| doc.set_gate(day)).await?;
        Ok(matches!(outcome, UpdateOutcome::Written { .. }))
    }

    /// Per-rule and per-symbol counts for `day`.
    ///
    /// # Errors
    ///
    /// Returns the store error when the document cannot be loaded and
    /// nothing is cached.
    pub async fn day_stats(&self, day: &DayKey) -> Result<DayStats> {
        if let Some(stats) = self.read_cache(true, |doc| doc.day_stats(day)) {
            return Ok(stats);
        }
        if let Err(e) = self.reload().await {
            return self
                .read_cache(false, |doc| doc.day_stats(day))
                .ok_or(e);
        }
        Ok(self
            .read_cache(false, |doc| doc.day_stats(day))
            .unwrap_or_default())
    }

    // ==================== Internals ====================

    fn read_cache<T>(&self, fresh_only: bool, f: impl FnOnce(&LedgerDocument) -> T) -> Option<T> {
        let cache = self.cache.lock();
        let cached = cache.as_ref()?;
        if fresh_only && cached.fetched_at.elapsed() >= self.settings.cache_ttl {
            return None;
        }
        Some(f(&cached.doc))
    }

    fn store_cache(&self, doc: LedgerDocument) {
        *self.cache.lock() = Some(CachedDocument {
            doc,
            fetched_at: Instant::now(),
        });
    }

    async fn reload(&self) -> Result<()> {
        let (doc, _) = self.load_fresh().await?;
        self.store_cache(doc);
        Ok(())
    }

    async fn load_fresh(&self) -> std::result::Result<(LedgerDocument, Option<Revision>), StoreError> {
        let versioned = self.store.get(&self.settings.key).await?;
        let doc = match LedgerDocument::parse(versioned.content.as_deref()) {
            Ok(doc) => doc,
            Err(e) => {
                // the next successful write replaces the unreadable content
                warn!(key = %self.settings.key, error = %e, "Unreadable ledger document, treating as empty");
                LedgerDocument::default()
            }
        };
        Ok((doc, versioned.revision))
    }

    /// Read, mutate, prune, conditionally write; retried on conflict.
    ///
    /// `mutate` returns the number of changes it made and is re-applied to
    /// the freshly loaded document on every attempt.
    async fn update<F>(&self, op: &'static str, mut mutate: F) -> Result<UpdateOutcome>
    where
        F: FnMut(&mut LedgerDocument) -> usize + Send,
    {
        let _guard = self.write_lock.lock().await;

        let max_attempts = self.settings.max_attempts.max(1);
        let mut delay = self.settings.backoff_base;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.settings.backoff_max);
            }

            let (mut doc, revision) = match self.load_fresh().await {
                Ok(loaded) => loaded,
                Err(e) if e.is_transient() => {
                    warn!(op, attempt, error = %e, "Ledger load failed, retrying");
                    last_error = e.to_string();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let changed = mutate(&mut doc);
            if changed == 0 {
                self.store_cache(doc);
                return Ok(UpdateOutcome::Unchanged);
            }

            let pruned = doc.prune(self.settings.retention_days);
            if pruned > 0 {
                debug!(op, pruned, "Pruned expired day partitions");
            }
            let content = doc.to_json()?;

            match self
                .store
                .put(&self.settings.key, &content, revision.as_ref())
                .await
            {
                Ok(PutOutcome::Written(_)) => {
                    self.store_cache(doc);
                    return Ok(UpdateOutcome::Written {
                        changed,
                        attempts: attempt,
                    });
                }
                Ok(PutOutcome::Conflict) => {
                    self.conflicts.fetch_add(1, Ordering::Relaxed);
                    warn!(op, attempt, delay_ms = delay.as_millis() as u64, "Ledger revision conflict, reloading");
                    last_error = "revision conflict".to_string();
                }
                Err(e) if e.is_transient() => {
                    warn!(op, attempt, error = %e, delay_ms = delay.as_millis() as u64, "Ledger write failed, retrying");
                    last_error = e.to_string();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

impl std::fmt::Debug for DedupLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupLedger")
            .field("settings", &self.settings)
            .field("conflicts", &self.conflicts())
            .finish_non_exhaustive()
    }
}
