//! End-of-day summary job.
//!
//! Lists the symbols that triggered several rules today. The ledger's daily
//! gate makes the job run once per day no matter how often it is invoked;
//! the gate is set only after the summary was delivered.

use crate::coordinator::send_with_retry;
use crate::limiter::SendLimiter;
use crate::message::MessageRenderer;
use bourse_tracker_core::{DayKey, MessageSink, SinkError, SummaryConfig};
use bourse_tracker_ledger::{DedupLedger, LedgerError};
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("daily summary ledger access failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("daily summary delivery failed: {0}")]
    Delivery(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The gate was already set for the day.
    AlreadySent,
    Sent {
        frequent: usize,
        total_symbols: usize,
        /// False when delivery succeeded but setting the gate failed.
        gate_recorded: bool,
    },
}

pub struct DailySummary {
    ledger: Arc<DedupLedger>,
    sink: Arc<dyn MessageSink>,
    limiter: SendLimiter,
    renderer: MessageRenderer,
    min_count: usize,
    /// Zero means no limit.
    max_symbols: usize,
}

impl DailySummary {
    #[must_use]
    pub fn new(
        ledger: Arc<DedupLedger>,
        sink: Arc<dyn MessageSink>,
        limiter: SendLimiter,
        renderer: MessageRenderer,
        config: &SummaryConfig,
    ) -> Self {
        Self {
            ledger,
            sink,
            limiter,
            renderer,
            min_count: config.min_count.max(1),
            max_symbols: config.max_symbols,
        }
    }

    /// Sends today's summary unless it was already sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or the message could
    /// not be delivered. The gate stays unset in both cases.
    pub async fn run(&self, day: &DayKey, at: &DateTime<Tz>) -> Result<SummaryOutcome, SummaryError> {
        if self.ledger.is_daily_gate_set(day).await? {
            info!(day = %day, "Daily summary already sent");
            return Ok(SummaryOutcome::AlreadySent);
        }

        let stats = self.ledger.day_stats(day).await?;
        let mut frequent = stats.frequent_symbols(self.min_count);
        if self.max_symbols > 0 {
            frequent.truncate(self.max_symbols);
        }
        let total_symbols = stats.by_symbol.len();
        info!(
            day = %day,
            alerts = stats.total,
            symbols = total_symbols,
            frequent = frequent.len(),
            "Building daily summary"
        );

        let text = self.renderer.render_summary(&frequent, total_symbols, at);
        send_with_retry(self.sink.as_ref(), &self.limiter, &text, "daily_summary").await?;

        let gate_recorded = match self.ledger.set_daily_gate(day).await {
            Ok(_) => true,
            Err(e) => {
                error!(day = %day, error = %e, "Summary delivered but gate not recorded, it may be sent again");
                false
            }
        };

        Ok(SummaryOutcome::Sent {
            frequent: frequent.len(),
            total_symbols,
            gate_recorded,
        })
    }
}

impl std::fmt::Debug for DailySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailySummary")
            .field("min_count", &self.min_count)
            .field("max_symbols", &self.max_symbols)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bourse_tracker_core::LedgerEntry;
    use bourse_tracker_ledger::{LedgerSettings, MemoryStore};
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CapturingSink {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSink for CapturingSink {
        async fn send(&self, text: &str) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Permanent("chat not found".to_string()));
            }
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    fn ledger(store: Arc<MemoryStore>) -> Arc<DedupLedger> {
        Arc::new(DedupLedger::new(
            store,
            LedgerSettings {
                key: "alert_cache.json".to_string(),
                retention_days: 3,
                cache_ttl: Duration::from_secs(30),
                max_attempts: 3,
                backoff_base: Duration::from_millis(5),
                backoff_max: Duration::from_millis(20),
            },
        ))
    }

    fn job(ledger: Arc<DedupLedger>, sink: Arc<CapturingSink>) -> DailySummary {
        DailySummary::new(
            ledger,
            sink,
            SendLimiter::new(1, Duration::ZERO),
            MessageRenderer::new("@c"),
            &SummaryConfig::default(),
        )
    }

    fn at() -> DateTime<Tz> {
        chrono_tz::Asia::Tehran
            .with_ymd_and_hms(2026, 10, 17, 13, 0, 0)
            .single()
            .unwrap()
    }

    async fn seed(ledger: &DedupLedger, day: &DayKey) {
        ledger
            .commit(
                day,
                &[
                    LedgerEntry::new("AAA", "strong_buying"),
                    LedgerEntry::new("AAA", "suspicious_volume"),
                    LedgerEntry::new("BBB", "watchlist"),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_summary_sent_once_per_day() {
        let day = DayKey::from("2026-10-17");
        let ledger = ledger(Arc::new(MemoryStore::new()));
        seed(&ledger, &day).await;
        let sink = Arc::new(CapturingSink::default());
        let job = job(Arc::clone(&ledger), Arc::clone(&sink));

        let first = job.run(&day, &at()).await.unwrap();
        let second = job.run(&day, &at()).await.unwrap();

        assert_eq!(
            first,
            SummaryOutcome::Sent {
                frequent: 1,
                total_symbols: 2,
                gate_recorded: true
            }
        );
        assert_eq!(second, SummaryOutcome::AlreadySent);
        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("#AAA"));
        assert!(!sent[0].contains("#BBB"));
    }

    #[tokio::test]
    async fn test_gate_not_set_when_delivery_fails() {
        let day = DayKey::from("2026-10-17");
        let ledger = ledger(Arc::new(MemoryStore::new()));
        seed(&ledger, &day).await;
        let sink = Arc::new(CapturingSink {
            fail: true,
            ..Default::default()
        });

        let result = job(Arc::clone(&ledger), sink).run(&day, &at()).await;

        assert!(matches!(result, Err(SummaryError::Delivery(_))));
        assert!(!ledger.is_daily_gate_set(&day).await.unwrap());
    }
}
