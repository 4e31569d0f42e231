use clap::{Parser, Subcommand};

mod commands;

use commands::{DailySummaryArgs, ScanArgs};

#[derive(Parser)]
#[command(name = "bourse-tracker")]
#[command(about = "Tehran stock exchange signal alerts for Telegram", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a market snapshot, evaluate the rules and send new alerts
    Scan(ScanArgs),
    /// Send the end-of-day summary of frequently alerted symbols
    DailySummary(DailySummaryArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let result = match cli.command {
        Commands::Scan(args) => commands::run_scan(args).await,
        Commands::DailySummary(args) => commands::run_daily_summary(args).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Run aborted");
    }
    result
}
