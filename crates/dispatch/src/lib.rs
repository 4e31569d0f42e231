//! Alert delivery.
//!
//! Renders match batches as HTML, sends them to Telegram under a
//! concurrency and pacing limit, and records delivered batches in the
//! dedup ledger. Also hosts the once-per-day summary job.

pub mod coordinator;
pub mod limiter;
pub mod message;
pub mod summary;
pub mod telegram;

pub use coordinator::{
    plan_batches, send_with_retry, Batch, BatchPolicy, DispatchCoordinator, DispatchReport,
};
pub use limiter::SendLimiter;
pub use message::{escape_html, rule_title, MessageRenderer};
pub use summary::{DailySummary, SummaryError, SummaryOutcome};
pub use telegram::TelegramSink;
