//! Shared startup for commands: configuration, ledger and sink.
//!
//! Everything here runs before any dispatch attempt. A failure is fatal for
//! the run.

use anyhow::{Context, Result};
use bourse_tracker_core::{AppConfig, ConfigLoader, MessageSink};
use bourse_tracker_dispatch::TelegramSink;
use bourse_tracker_ledger::{DedupLedger, GistStore, LedgerSettings};
use std::path::Path;
use std::sync::Arc;

/// Loads and validates configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a setting is invalid.
pub fn load_config(path: &str) -> Result<AppConfig> {
    let config = ConfigLoader::load_from(Path::new(path))
        .with_context(|| format!("failed to load configuration from {path}"))?;
    config.validate().context("invalid configuration")?;
    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

/// Connects to the ledger and loads the current document.
///
/// # Errors
///
/// Returns an error if credentials are missing or the ledger is unreachable.
pub async fn connect_ledger(config: &AppConfig) -> Result<Arc<DedupLedger>> {
    config.require_ledger()?;
    let store = GistStore::new(&config.ledger).context("failed to build ledger store")?;
    let ledger = DedupLedger::new(Arc::new(store), LedgerSettings::from(&config.ledger));
    ledger
        .warm()
        .await
        .context("cannot read the alert ledger")?;
    Ok(Arc::new(ledger))
}

/// Builds the Telegram sink.
///
/// # Errors
///
/// Returns an error if credentials are missing or the client cannot be built.
pub fn build_sink(config: &AppConfig) -> Result<Arc<dyn MessageSink>> {
    config.require_telegram()?;
    let sink = TelegramSink::new(&config.telegram).context("failed to build Telegram client")?;
    Ok(Arc::new(sink))
}
