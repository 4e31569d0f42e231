//! Dispatch coordinator.
//!
//! Drops matches the ledger already holds, cuts the rest into per-rule
//! batches and sends every batch concurrently under the [`SendLimiter`].
//! A batch's ledger entries are committed only after the sink confirmed
//! delivery. Batches fail independently.

use crate::limiter::SendLimiter;
use crate::message::MessageRenderer;
use bourse_tracker_core::{DayKey, LedgerEntry, Match, MessageSink, SinkError};
use bourse_tracker_ledger::{CommitOutcome, DedupLedger};
use bourse_tracker_signals::{MatchSet, RuleBook};
use chrono::DateTime;
use chrono_tz::Tz;
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest rate-limit wait honored before a retry. Longer waits give up
/// on the message for this run.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Batch size per rule, with a fallback for rules without an override.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    default_size: usize,
    per_rule: BTreeMap<String, usize>,
}

impl BatchPolicy {
    #[must_use]
    pub fn new(default_size: usize) -> Self {
        Self {
            default_size: default_size.max(1),
            per_rule: BTreeMap::new(),
        }
    }

    /// Collects the batch size overrides of every rule in the book.
    #[must_use]
    pub fn from_book(book: &RuleBook, default_size: usize) -> Self {
        let mut policy = Self::new(default_size);
        for name in book.names() {
            if let Some(size) = book.batch_size(name) {
                policy = policy.with_rule(name, size);
            }
        }
        policy
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>, size: usize) -> Self {
        self.per_rule.insert(rule.into(), size.max(1));
        self
    }

    #[must_use]
    pub fn size_for(&self, rule: &str) -> usize {
        self.per_rule.get(rule).copied().unwrap_or(self.default_size)
    }
}

/// A group of one rule's matches sent as a single message.
#[derive(Debug, Clone)]
pub struct Batch {
    pub rule: String,
    /// Position of the batch within its rule.
    pub index: usize,
    pub matches: Vec<Match>,
}

impl Batch {
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.matches.iter().map(Match::entry).collect()
    }

    fn label(&self) -> String {
        format!("{}#{}", self.rule, self.index)
    }
}

/// Cuts each rule's matches into batches, preserving match order.
#[must_use]
pub fn plan_batches(fresh: &[(String, Vec<Match>)], policy: &BatchPolicy) -> Vec<Batch> {
    fresh
        .iter()
        .flat_map(|(rule, matches)| {
            matches
                .chunks(policy.size_for(rule))
                .enumerate()
                .map(|(index, chunk)| Batch {
                    rule: rule.clone(),
                    index,
                    matches: chunk.to_vec(),
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOutcome {
    Delivered { recorded: bool },
    Failed,
}

/// Counts for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Matches delivered.
    pub sent: usize,
    /// Matches dropped because the ledger already held them.
    pub skipped: usize,
    /// Matches left out because the ledger could not be consulted.
    pub unchecked: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Delivered batches whose ledger commit failed. These may be sent
    /// again by a later run.
    pub unrecorded_batches: usize,
}

pub struct DispatchCoordinator {
    sink: Arc<dyn MessageSink>,
    ledger: Arc<DedupLedger>,
    limiter: SendLimiter,
    renderer: MessageRenderer,
    policy: BatchPolicy,
}

impl DispatchCoordinator {
    #[must_use]
    pub fn new(
        sink: Arc<dyn MessageSink>,
        ledger: Arc<DedupLedger>,
        limiter: SendLimiter,
        renderer: MessageRenderer,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            sink,
            ledger,
            limiter,
            renderer,
            policy,
        }
    }

    /// Sends every match not yet recorded for `day`.
    pub async fn dispatch(
        &self,
        day: &DayKey,
        at: &DateTime<Tz>,
        matches: &MatchSet,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut fresh = Vec::new();

        for rule in matches.iter() {
            let mut pending = Vec::new();
            for m in &rule.matches {
                match self.ledger.already_sent(day, &m.entry()).await {
                    Ok(true) => report.skipped += 1,
                    Ok(false) => pending.push(m.clone()),
                    Err(e) => {
                        warn!(entry = %m.entry(), error = %e, "Ledger check failed, holding match for a later run");
                        report.unchecked += 1;
                    }
                }
            }
            if !pending.is_empty() {
                fresh.push((rule.rule.clone(), pending));
            }
        }

        let batches = plan_batches(&fresh, &self.policy);
        report.batches = batches.len();
        info!(
            batches = batches.len(),
            skipped = report.skipped,
            max_in_flight = self.limiter.max_in_flight(),
            min_spacing_ms = self.limiter.min_spacing().as_millis() as u64,
            "Dispatching alert batches"
        );

        let outcomes = join_all(batches.iter().map(|batch| self.deliver(day, at, batch))).await;

        for (batch, outcome) in batches.iter().zip(outcomes) {
            match outcome {
                BatchOutcome::Delivered { recorded } => {
                    report.sent += batch.matches.len();
                    if !recorded {
                        report.unrecorded_batches += 1;
                    }
                }
                BatchOutcome::Failed => report.failed_batches += 1,
            }
        }

        report
    }

    async fn deliver(&self, day: &DayKey, at: &DateTime<Tz>, batch: &Batch) -> BatchOutcome {
        let label = batch.label();
        let text = self.renderer.render_batch(&batch.rule, &batch.matches, at);

        let sent = match self.limiter.acquire().await {
            Ok(_permit) => send_with_retry(self.sink.as_ref(), &self.limiter, &text, &label).await,
            Err(e) => {
                error!(batch = %label, error = %e, "Send limiter closed");
                return BatchOutcome::Failed;
            }
        };
        if sent.is_err() {
            return BatchOutcome::Failed;
        }

        match self.ledger.commit(day, &batch.entries()).await {
            Ok(CommitOutcome::Written { added, attempts }) => {
                debug!(batch = %label, added, attempts, "Batch recorded");
                BatchOutcome::Delivered { recorded: true }
            }
            Ok(CommitOutcome::AlreadyPresent) => BatchOutcome::Delivered { recorded: true },
            Err(e) => {
                error!(
                    batch = %label,
                    error = %e,
                    "Batch delivered but not recorded, it may be sent again"
                );
                BatchOutcome::Delivered { recorded: false }
            }
        }
    }
}

impl std::fmt::Debug for DispatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("limiter", &self.limiter)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Sends one message, retrying at most once.
///
/// A rate-limit signal waits the requested time first; a timeout or
/// transient failure retries straight away; a permanent failure gives up.
/// Every attempt waits for the limiter's pacing.
///
/// # Errors
///
/// Returns the last sink error when the message was not delivered.
pub async fn send_with_retry(
    sink: &dyn MessageSink,
    limiter: &SendLimiter,
    text: &str,
    label: &str,
) -> Result<(), SinkError> {
    let mut retried = false;
    loop {
        limiter.pace().await;
        let err = match sink.send(text).await {
            Ok(()) => {
                debug!(batch = label, retried, "Message delivered");
                return Ok(());
            }
            Err(e) => e,
        };

        if retried || !err.is_transient() {
            warn!(batch = label, error = %err, "Giving up on message for this run");
            return Err(err);
        }
        retried = true;

        if let SinkError::RateLimited { retry_after } = &err {
            if *retry_after > MAX_RATE_LIMIT_WAIT {
                warn!(
                    batch = label,
                    retry_after_secs = retry_after.as_secs(),
                    "Sink rate limit outlasts this run, leaving message for the next one"
                );
                return Err(err);
            }
            warn!(
                batch = label,
                delay_ms = retry_after.as_millis() as u64,
                "Sink rate limited, waiting before retry"
            );
            tokio::time::sleep(*retry_after).await;
        } else {
            warn!(batch = label, error = %err, "Send failed, retrying once");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bourse_tracker_core::{LedgerStore, PutOutcome, Revision, SnapshotRow, StoreError, Versioned};
    use bourse_tracker_ledger::{LedgerDocument, LedgerSettings, MemoryStore};
    use bourse_tracker_signals::RuleMatches;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const KEY: &str = "alert_cache.json";

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Sent(Vec<String>),
        Committed(BTreeSet<String>),
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    /// Records sends, tracks concurrency and replays scripted failures.
    struct RecordingSink {
        universe: Vec<String>,
        log: EventLog,
        delay: Duration,
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        starts: Mutex<Vec<Instant>>,
        script: Mutex<VecDeque<SinkError>>,
    }

    impl RecordingSink {
        fn new(universe: &[String], log: EventLog) -> Self {
            Self {
                universe: universe.to_vec(),
                log,
                delay: Duration::from_millis(30),
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                starts: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
            }
        }

        fn failing_with(self, errors: Vec<SinkError>) -> Self {
            *self.script.lock() = errors.into();
            self
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, text: &str) -> Result<(), SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.starts.lock().push(Instant::now());
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            let scripted = self.script.lock().pop_front();
            if let Some(err) = scripted {
                return Err(err);
            }
            let symbols = self
                .universe
                .iter()
                .filter(|s| text.contains(s.as_str()))
                .cloned()
                .collect();
            self.log.lock().push(Event::Sent(symbols));
            Ok(())
        }
    }

    /// Memory store that logs which symbols each write holds.
    struct RecordingStore {
        inner: MemoryStore,
        log: EventLog,
    }

    #[async_trait]
    impl LedgerStore for RecordingStore {
        async fn get(&self, key: &str) -> Result<Versioned, StoreError> {
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &str,
            content: &str,
            expected: Option<&Revision>,
        ) -> Result<PutOutcome, StoreError> {
            let outcome = self.inner.put(key, content, expected).await?;
            if matches!(outcome, PutOutcome::Written(_)) {
                let doc = LedgerDocument::parse(Some(content)).unwrap_or_default();
                let symbols = doc
                    .alerts
                    .values()
                    .flatten()
                    .map(|e| e.symbol.clone())
                    .collect();
                self.log.lock().push(Event::Committed(symbols));
            }
            Ok(outcome)
        }
    }

    fn settings() -> LedgerSettings {
        LedgerSettings {
            key: KEY.to_string(),
            retention_days: 3,
            cache_ttl: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_millis(5),
            backoff_max: Duration::from_millis(20),
        }
    }

    fn at() -> DateTime<Tz> {
        chrono_tz::Asia::Tehran
            .with_ymd_and_hms(2026, 10, 17, 10, 0, 0)
            .single()
            .unwrap()
    }

    fn today() -> DayKey {
        DayKey::from("2026-10-17")
    }

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{i:02}")).collect()
    }

    fn match_set(rule: &str, symbols: &[String]) -> MatchSet {
        let matches = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| Match {
                symbol: s.clone(),
                rule: rule.to_string(),
                row: Arc::new(SnapshotRow::new(s.as_str())),
                rank: (symbols.len() - i) as f64,
                threshold: None,
            })
            .collect();
        MatchSet {
            rules: vec![RuleMatches {
                rule: rule.to_string(),
                matches,
                missing_input: 0,
                active: true,
            }],
        }
    }

    fn coordinator(
        sink: Arc<RecordingSink>,
        store: Arc<dyn LedgerStore>,
        limiter: SendLimiter,
        policy: BatchPolicy,
    ) -> (DispatchCoordinator, Arc<DedupLedger>) {
        let ledger = Arc::new(DedupLedger::new(store, settings()));
        let coordinator = DispatchCoordinator::new(
            sink,
            Arc::clone(&ledger),
            limiter,
            MessageRenderer::new("@c"),
            policy,
        );
        (coordinator, ledger)
    }

    // ==================== Batch Planning Tests ====================

    #[test]
    fn test_plan_batches_uses_rule_size() {
        let set = match_set("strong_buying", &symbols(12));
        let fresh = vec![("strong_buying".to_string(), set.rules[0].matches.clone())];

        let batches = plan_batches(&fresh, &BatchPolicy::new(5));
        let sizes: Vec<_> = batches.iter().map(|b| b.matches.len()).collect();

        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(batches[0].matches[0].symbol, "S00");
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn test_batch_policy_override() {
        let policy = BatchPolicy::new(5).with_rule("ceiling_queue", 3);

        assert_eq!(policy.size_for("ceiling_queue"), 3);
        assert_eq!(policy.size_for("watchlist"), 5);
    }

    #[test]
    fn test_batch_policy_from_default_book() {
        let book = RuleBook::from_config(&bourse_tracker_core::RulesConfig::default());
        let policy = BatchPolicy::from_book(&book, 5);

        assert_eq!(policy.size_for("ceiling_queue"), 3);
        assert_eq!(policy.size_for("tick_time"), 3);
        assert_eq!(policy.size_for("strong_buying"), 5);
    }

    // ==================== Dispatch Tests ====================

    #[tokio::test]
    async fn test_twelve_matches_three_batches_commit_after_send() {
        let log: EventLog = Arc::default();
        let universe = symbols(12);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let store = Arc::new(RecordingStore {
            inner: MemoryStore::new(),
            log: Arc::clone(&log),
        });
        let (coordinator, ledger) = coordinator(
            Arc::clone(&sink),
            store,
            SendLimiter::new(3, Duration::ZERO),
            BatchPolicy::new(5),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("strong_buying", &universe))
            .await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.sent, 12);
        assert_eq!(report.failed_batches, 0);
        assert!(sink.peak.load(Ordering::SeqCst) <= 3);

        let events = log.lock().clone();
        for symbol in &universe {
            let sent_at = events
                .iter()
                .position(|e| matches!(e, Event::Sent(s) if s.contains(symbol)))
                .unwrap();
            let committed_at = events
                .iter()
                .position(|e| matches!(e, Event::Committed(s) if s.contains(symbol)))
                .unwrap();
            assert!(sent_at < committed_at, "{symbol} committed before send");
        }
        assert_eq!(ledger.day_stats(&today()).await.unwrap().total, 12);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_limit() {
        let log: EventLog = Arc::default();
        let universe = symbols(12);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(MemoryStore::new()),
            SendLimiter::new(2, Duration::ZERO),
            BatchPolicy::new(2),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        assert_eq!(report.batches, 6);
        assert_eq!(sink.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sends_respect_min_spacing() {
        let log: EventLog = Arc::default();
        let universe = symbols(4);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(MemoryStore::new()),
            SendLimiter::new(4, Duration::from_millis(50)),
            BatchPolicy::new(1),
        );

        coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        let mut starts = sink.starts.lock().clone();
        starts.sort();
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(45));
        }
    }

    #[tokio::test]
    async fn test_already_sent_matches_are_skipped() {
        let store = MemoryStore::new().with_document(
            KEY,
            r#"{"alerts":{"2026-10-17":[{"symbol":"S00","rule":"strong_buying"}]}}"#,
        );
        let log: EventLog = Arc::default();
        let universe = symbols(2);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(store),
            SendLimiter::new(2, Duration::ZERO),
            BatchPolicy::new(5),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("strong_buying", &universe))
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(log.lock()[0], Event::Sent(vec!["S01".to_string()]));
    }

    #[tokio::test]
    async fn test_second_run_sends_nothing() {
        let log: EventLog = Arc::default();
        let universe = symbols(3);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(MemoryStore::new()),
            SendLimiter::new(2, Duration::ZERO),
            BatchPolicy::new(5),
        );
        let set = match_set("r1", &universe);

        coordinator.dispatch(&today(), &at(), &set).await;
        let second = coordinator.dispatch(&today(), &at(), &set).await;

        assert_eq!(second.skipped, 3);
        assert_eq!(second.batches, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_batch_retried_once() {
        let log: EventLog = Arc::default();
        let universe = symbols(1);
        let sink = Arc::new(
            RecordingSink::new(&universe, Arc::clone(&log)).failing_with(vec![
                SinkError::RateLimited {
                    retry_after: Duration::from_millis(20),
                },
            ]),
        );
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(MemoryStore::new()),
            SendLimiter::new(1, Duration::ZERO),
            BatchPolicy::new(5),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        assert_eq!(report.sent, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_honored_in_full() {
        let universe = symbols(1);
        let sink = RecordingSink::new(&universe, EventLog::default()).failing_with(vec![
            SinkError::RateLimited {
                retry_after: Duration::from_secs(45),
            },
        ]);
        let limiter = SendLimiter::new(1, Duration::ZERO);

        let started = tokio::time::Instant::now();
        send_with_retry(&sink, &limiter, &universe[0], "r1#0")
            .await
            .unwrap();

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_beyond_cap_gives_up_without_retry() {
        let universe = symbols(1);
        let sink = RecordingSink::new(&universe, EventLog::default()).failing_with(vec![
            SinkError::RateLimited {
                retry_after: Duration::from_secs(120),
            },
            SinkError::RateLimited {
                retry_after: Duration::from_secs(120),
            },
        ]);
        let limiter = SendLimiter::new(1, Duration::ZERO);

        let started = tokio::time::Instant::now();
        let result = send_with_retry(&sink, &limiter, &universe[0], "r1#0").await;

        assert!(matches!(result, Err(SinkError::RateLimited { .. })));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < MAX_RATE_LIMIT_WAIT);
    }

    #[tokio::test]
    async fn test_batch_given_up_after_second_failure() {
        let log: EventLog = Arc::default();
        let universe = symbols(1);
        let sink = Arc::new(
            RecordingSink::new(&universe, Arc::clone(&log)).failing_with(vec![
                SinkError::Timeout("slow".to_string()),
                SinkError::Timeout("slow".to_string()),
            ]),
        );
        let store = Arc::new(MemoryStore::new());
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            store.clone(),
            SendLimiter::new(1, Duration::ZERO),
            BatchPolicy::new(5),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried_and_isolated() {
        let log: EventLog = Arc::default();
        let universe = symbols(2);
        let sink = Arc::new(
            RecordingSink::new(&universe, Arc::clone(&log))
                .failing_with(vec![SinkError::Permanent("bad request".to_string())]),
        );
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(MemoryStore::new()),
            SendLimiter::new(1, Duration::ZERO),
            BatchPolicy::new(1),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_commit_failure_reported_as_unrecorded() {
        struct RejectingStore;

        #[async_trait]
        impl LedgerStore for RejectingStore {
            async fn get(&self, _key: &str) -> Result<Versioned, StoreError> {
                Ok(Versioned::default())
            }

            async fn put(
                &self,
                _key: &str,
                _content: &str,
                _expected: Option<&Revision>,
            ) -> Result<PutOutcome, StoreError> {
                Ok(PutOutcome::Conflict)
            }
        }

        let log: EventLog = Arc::default();
        let universe = symbols(1);
        let sink = Arc::new(RecordingSink::new(&universe, Arc::clone(&log)));
        let (coordinator, _) = coordinator(
            Arc::clone(&sink),
            Arc::new(RejectingStore),
            SendLimiter::new(1, Duration::ZERO),
            BatchPolicy::new(5),
        );

        let report = coordinator
            .dispatch(&today(), &at(), &match_set("r1", &universe))
            .await;

        assert_eq!(report.sent, 1);
        assert_eq!(report.unrecorded_batches, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }
}
