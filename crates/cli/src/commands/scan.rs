//! Scan command.
//!
//! One full cycle: fetch snapshots from every provider, normalize, evaluate
//! the rule book and dispatch the alerts that were not sent yet today.

use super::bootstrap::{build_sink, connect_ledger, load_config};
use anyhow::{bail, Context, Result};
use bourse_tracker_core::config_loader::DEFAULT_CONFIG_PATH;
use bourse_tracker_core::{DataProvider, MarketSession};
use bourse_tracker_data::{normalize, HttpProvider, SnapshotFetcher};
use bourse_tracker_dispatch::{BatchPolicy, DispatchCoordinator, MessageRenderer, SendLimiter};
use bourse_tracker_signals::{evaluate, EvalContext, MatchSet, RuleBook};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments for the scan command.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Config file path
    #[arg(short, long, env = "BOURSE_CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Evaluate and log matches without sending or recording anything
    #[arg(long)]
    pub dry_run: bool,

    /// Run even when the market is closed
    #[arg(long)]
    pub force: bool,
}

/// Runs the scan command.
///
/// # Errors
///
/// Returns an error on invalid configuration, an unreachable ledger, a sink
/// that cannot be built, or when no provider returned any data.
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let session = MarketSession::from_config(&config.market).context("invalid market settings")?;

    let now = Utc::now();
    let state = session.state_at(now);
    if !state.is_open() && !args.force {
        info!(?state, local_time = %session.local(now).format("%Y-%m-%d %H:%M"), "Market closed, nothing to do");
        return Ok(());
    }

    let book = RuleBook::from_config(&config.rules);
    if book.is_empty() {
        warn!("No rules enabled, nothing to evaluate");
        return Ok(());
    }

    let providers = config
        .providers
        .iter()
        .map(|p| {
            HttpProvider::new(p)
                .map(|provider| Arc::new(provider) as Arc<dyn DataProvider>)
                .with_context(|| format!("failed to build provider {}", p.name))
        })
        .collect::<Result<Vec<_>>>()?;

    // connect before fetching so a dead ledger aborts the run up front
    let delivery = if args.dry_run {
        None
    } else {
        Some((connect_ledger(&config).await?, build_sink(&config)?))
    };

    let fetched = SnapshotFetcher::new(providers).fetch_all().await;
    if fetched.batches.is_empty() {
        bail!(
            "no provider returned data ({} fetch units failed)",
            fetched.failed_units
        );
    }

    let snapshot = normalize(fetched.records());
    info!(
        rows = snapshot.len(),
        records = snapshot.report.records_in,
        dropped = snapshot.report.dropped_no_symbol,
        "Snapshot normalized"
    );

    let ctx = EvalContext::at_hour(session.local_hour(now));
    let matches = evaluate(&snapshot.rows, &book, &ctx);
    log_matches(&matches);

    let Some((ledger, sink)) = delivery else {
        info!(matches = matches.total_matches(), "Dry run, nothing sent");
        return Ok(());
    };

    let day = session.day_key(now);
    let coordinator = DispatchCoordinator::new(
        sink,
        Arc::clone(&ledger),
        SendLimiter::from_config(&config.dispatch),
        MessageRenderer::new(&config.telegram.channel_name),
        BatchPolicy::from_book(&book, config.dispatch.default_batch_size),
    );
    let report = coordinator
        .dispatch(&day, &session.local(now), &matches)
        .await;

    info!(
        sent = report.sent,
        skipped = report.skipped,
        unchecked = report.unchecked,
        batches = report.batches,
        failed_batches = report.failed_batches,
        unrecorded_batches = report.unrecorded_batches,
        "Scan complete"
    );

    match ledger.day_stats(&day).await {
        Ok(stats) => {
            info!(day = %day, total = stats.total, symbols = stats.by_symbol.len(), "Alerts recorded today");
            for (rule, count) in &stats.by_rule {
                info!(rule = %rule, count, "  rule total");
            }
        }
        Err(e) => warn!(error = %e, "Could not read today's ledger statistics"),
    }

    Ok(())
}

fn log_matches(matches: &MatchSet) {
    for rule in matches.iter() {
        if !rule.active {
            info!(rule = %rule.rule, "Rule inactive at this hour");
            continue;
        }
        let symbols: Vec<&str> = rule.matches.iter().map(|m| m.symbol.as_str()).collect();
        info!(rule = %rule.rule, count = symbols.len(), symbols = ?symbols, "Rule matches");
    }
}
