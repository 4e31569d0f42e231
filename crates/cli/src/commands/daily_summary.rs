//! Daily summary command.
//!
//! Sends the end-of-day list of symbols that triggered several rules. Safe to
//! schedule repeatedly: the ledger gate lets it through once per day.

use super::bootstrap::{build_sink, connect_ledger, load_config};
use anyhow::{Context, Result};
use bourse_tracker_core::config_loader::DEFAULT_CONFIG_PATH;
use bourse_tracker_core::session::parse_hhmm;
use bourse_tracker_core::MarketSession;
use bourse_tracker_dispatch::{DailySummary, MessageRenderer, SendLimiter, SummaryOutcome};
use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

/// Arguments for the daily-summary command.
#[derive(Args, Debug, Clone)]
pub struct DailySummaryArgs {
    /// Config file path
    #[arg(short, long, env = "BOURSE_CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Run on a non-trading day or before the configured time
    #[arg(long)]
    pub force: bool,
}

/// Runs the daily-summary command.
///
/// # Errors
///
/// Returns an error on invalid configuration, an unreachable ledger, or a
/// summary that could not be delivered.
pub async fn run_daily_summary(args: DailySummaryArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let session = MarketSession::from_config(&config.market).context("invalid market settings")?;
    let not_before = parse_hhmm("summary.not_before", &config.summary.not_before)?;

    let now = Utc::now();
    if !args.force && !session.is_trading_day_after(now, not_before) {
        info!(
            local_time = %session.local(now).format("%Y-%m-%d %H:%M"),
            not_before = %config.summary.not_before,
            "Not a trading day or too early for the daily summary"
        );
        return Ok(());
    }

    let ledger = connect_ledger(&config).await?;
    let sink = build_sink(&config)?;
    let job = DailySummary::new(
        ledger,
        sink,
        SendLimiter::from_config(&config.dispatch),
        MessageRenderer::new(&config.telegram.channel_name),
        &config.summary,
    );

    let day = session.day_key(now);
    match job.run(&day, &session.local(now)).await? {
        SummaryOutcome::AlreadySent => {}
        SummaryOutcome::Sent {
            frequent,
            total_symbols,
            gate_recorded,
        } => {
            info!(day = %day, frequent, total_symbols, "Daily summary sent");
            if !gate_recorded {
                warn!(day = %day, "Daily gate not recorded");
            }
        }
    }

    Ok(())
}
