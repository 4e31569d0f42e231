//! Concurrent snapshot acquisition across providers and scopes.
//!
//! Each (provider, scope) pair is an independent fetch unit. Units run
//! concurrently, transient failures are retried a bounded number of times,
//! and a unit that still fails is logged and skipped.

use bourse_tracker_core::{DataProvider, ProviderError, RawRecord};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default number of retries for a transient fetch failure.
pub const MAX_FETCH_RETRIES: u32 = 2;

/// Base delay between fetch retries.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Maximum delay between fetch retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(4);

/// Records returned by one provider, in scope order.
#[derive(Debug, Clone)]
pub struct ProviderBatch {
    pub provider: String,
    pub scope: String,
    pub records: Vec<RawRecord>,
}

/// Outcome of a full fetch cycle.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successful units in provider declaration order, then scope order.
    pub batches: Vec<ProviderBatch>,
    pub failed_units: usize,
}

impl FetchReport {
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.batches.len() + self.failed_units
    }

    /// Iterates over all records in merge priority order.
    pub fn records(&self) -> impl Iterator<Item = &RawRecord> {
        self.batches.iter().flat_map(|b| b.records.iter())
    }
}

pub struct SnapshotFetcher {
    providers: Vec<Arc<dyn DataProvider>>,
    max_retries: u32,
    base_delay: Duration,
}

impl SnapshotFetcher {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn DataProvider>>) -> Self {
        Self {
            providers,
            max_retries: MAX_FETCH_RETRIES,
            base_delay: BASE_RETRY_DELAY,
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Fetches every (provider, scope) unit concurrently.
    ///
    /// Never fails as a whole: failed units are counted in the report.
    pub async fn fetch_all(&self) -> FetchReport {
        let units: Vec<(Arc<dyn DataProvider>, String)> = self
            .providers
            .iter()
            .flat_map(|provider| {
                let scopes = if provider.scopes().is_empty() {
                    vec![String::new()]
                } else {
                    provider.scopes().to_vec()
                };
                scopes
                    .into_iter()
                    .map(move |scope| (Arc::clone(provider), scope))
            })
            .collect();

        let futures: Vec<_> = units
            .into_iter()
            .map(|(provider, scope)| async move {
                let result = self.fetch_unit(provider.as_ref(), &scope).await;
                (provider.name().to_string(), scope, result)
            })
            .collect();

        let mut report = FetchReport::default();
        for (provider, scope, result) in join_all(futures).await {
            match result {
                Ok(records) => {
                    tracing::debug!(provider = %provider, scope = %scope, records = records.len(), "fetched");
                    report.batches.push(ProviderBatch {
                        provider,
                        scope,
                        records,
                    });
                }
                Err(e) => {
                    warn!(provider = %provider, scope = %scope, error = %e, "Fetch unit failed, skipping");
                    report.failed_units += 1;
                }
            }
        }

        info!(
            units = report.unit_count(),
            failed = report.failed_units,
            records = report.record_count(),
            "Snapshot fetch complete"
        );
        report
    }

    async fn fetch_unit(
        &self,
        provider: &dyn DataProvider,
        scope: &str,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let mut delay = self.base_delay;

        for attempt in 0..=self.max_retries {
            match provider.fetch(scope).await {
                Ok(records) => return Ok(records),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let wait = match &e {
                        ProviderError::RateLimit { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs).min(MAX_RETRY_DELAY)
                        }
                        _ => delay,
                    };
                    warn!(
                        provider = provider.name(),
                        scope,
                        attempt = attempt + 1,
                        error = %e,
                        delay_ms = wait.as_millis() as u64,
                        "Retrying fetch after transient error"
                    );
                    tokio::time::sleep(wait).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::Network("retry loop exhausted".to_string()))
    }
}
