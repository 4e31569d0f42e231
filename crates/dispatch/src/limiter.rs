//! Send limiting for the messaging sink.
//!
//! Two independent bounds: a semaphore caps how many sends are in flight,
//! and a GCRA limiter with a burst of one enforces a minimum gap between
//! consecutive send starts even when slots are free.

use bourse_tracker_core::DispatchConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::time::Duration;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

pub struct SendLimiter {
    slots: Semaphore,
    max_in_flight: usize,
    pacer: Option<DefaultDirectRateLimiter>,
    min_spacing: Duration,
}

impl SendLimiter {
    /// A zero `max_in_flight` is raised to one. A zero spacing disables
    /// pacing.
    #[must_use]
    pub fn new(max_in_flight: usize, min_spacing: Duration) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let pacer = Quota::with_period(min_spacing)
            .map(|quota| RateLimiter::direct(quota.allow_burst(nonzero!(1u32))));

        Self {
            slots: Semaphore::new(max_in_flight),
            max_in_flight,
            pacer,
            min_spacing,
        }
    }

    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.max_in_flight,
            Duration::from_millis(config.min_send_spacing_ms),
        )
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    #[must_use]
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Waits for a free in-flight slot. The slot is released when the
    /// permit drops.
    ///
    /// # Errors
    ///
    /// Fails only if the limiter has been closed.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.slots.acquire().await
    }

    /// Waits until the next send may start.
    pub async fn pace(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }
    }
}

impl std::fmt::Debug for SendLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendLimiter")
            .field("max_in_flight", &self.max_in_flight)
            .field("available", &self.slots.available_permits())
            .field("min_spacing", &self.min_spacing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_in_flight_bound() {
        let limiter = Arc::new(SendLimiter::new(2, Duration::ZERO));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|_| {
            let limiter = Arc::clone(&limiter);
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            async move {
                let _permit = limiter.acquire().await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }
        });
        futures_util::future::join_all(tasks).await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pacing_spaces_consecutive_starts() {
        let limiter = SendLimiter::new(4, Duration::from_millis(40));
        let mut starts = Vec::new();

        for _ in 0..3 {
            limiter.pace().await;
            starts.push(Instant::now());
        }

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(35));
        }
    }

    #[tokio::test]
    async fn test_zero_spacing_does_not_wait() {
        let limiter = SendLimiter::new(1, Duration::ZERO);
        let started = Instant::now();

        for _ in 0..10 {
            limiter.pace().await;
        }

        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.max_in_flight(), 1);
    }
}
