//! CLI commands for the bourse alert tracker.

pub mod bootstrap;
pub mod daily_summary;
pub mod scan;

pub use daily_summary::{run_daily_summary, DailySummaryArgs};
pub use scan::{run_scan, ScanArgs};
