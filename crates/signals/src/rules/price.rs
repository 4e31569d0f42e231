//! Rules driven by price action within the day's range.

use crate::rule::{ensure_batch_size, ensure_finite, hit_if, metric, Hit, Rule};
use bourse_tracker_core::config::{SwingTradeConfig, TickTimeConfig, WatchlistConfig};
use bourse_tracker_core::{ConfigError, Field, SnapshotRow};

/// Percent values are quoted to two decimals upstream.
const PCT_TOLERANCE: f64 = 0.005;

/// Watched symbols whose last change crossed a per-symbol threshold.
#[derive(Debug, Clone)]
pub struct Watchlist {
    config: WatchlistConfig,
}

impl Watchlist {
    pub const NAME: &'static str = "watchlist";

    #[must_use]
    pub fn new(config: WatchlistConfig) -> Self {
        Self { config }
    }
}

impl Rule for Watchlist {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::LastChangePct]
    }

    fn rank_field(&self) -> Field {
        Field::LastChangePct
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn considers(&self, row: &SnapshotRow) -> bool {
        self.config.symbols.contains_key(&row.symbol)
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let threshold = *self.config.symbols.get(&row.symbol)?;
        (metric(row, Field::LastChangePct) > threshold).then_some(Hit {
            threshold: Some(threshold),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_batch_size(Self::NAME, self.config.toggle.batch_size)?;
        if self.config.symbols.is_empty() {
            return Err(ConfigError::invalid(
                "rules.watchlist.symbols",
                "watchlist is empty",
            ));
        }
        for (symbol, threshold) in &self.config.symbols {
            if !threshold.is_finite() {
                return Err(ConfigError::invalid(
                    format!("rules.watchlist.symbols.{symbol}"),
                    format!("{threshold} is not a finite number"),
                ));
            }
        }
        Ok(())
    }
}

/// Opened near the low, closed the session well above the open, and the
/// last trade ticked above the closing price.
#[derive(Debug, Clone)]
pub struct TickTime {
    config: TickTimeConfig,
}

impl TickTime {
    pub const NAME: &'static str = "tick_time";
    /// Batch size used when none is configured.
    pub const DEFAULT_BATCH_SIZE: usize = 3;

    #[must_use]
    pub fn new(config: TickTimeConfig) -> Self {
        Self { config }
    }
}

impl Rule for TickTime {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[
            Field::FirstPrice,
            Field::LowPrice,
            Field::LastPrice,
            Field::TickDiff,
        ]
    }

    fn rank_field(&self) -> Field {
        Field::TickDiff
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.config.toggle.batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE))
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        let first = metric(row, Field::FirstPrice);
        hit_if(
            c.first_to_low_ratio * first > metric(row, Field::LowPrice)
                && c.last_to_first_ratio * metric(row, Field::LastPrice) > first
                && metric(row, Field::TickDiff) > c.min_tick_diff,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("first_to_low_ratio", c.first_to_low_ratio),
                ("last_to_first_ratio", c.last_to_first_ratio),
                ("min_tick_diff", c.min_tick_diff),
            ],
        )?;
        if c.first_to_low_ratio <= 0.0 || c.last_to_first_ratio <= 0.0 {
            return Err(ConfigError::invalid(
                "rules.tick_time",
                "ratios must be positive",
            ));
        }
        Ok(())
    }
}

/// Touched the lower price limit, recovered part of the drop, with strong
/// buyers behind the recovery.
#[derive(Debug, Clone)]
pub struct SwingTrade {
    config: SwingTradeConfig,
}

impl SwingTrade {
    pub const NAME: &'static str = "swing_trade";

    #[must_use]
    pub fn new(config: SwingTradeConfig) -> Self {
        Self { config }
    }
}

impl Rule for SwingTrade {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[
            Field::LowChangePct,
            Field::LastChangePct,
            Field::BuyPower,
            Field::BuyPerCapita,
            Field::ValueRatio,
        ]
    }

    fn rank_field(&self) -> Field {
        Field::BuyPower
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        let last = metric(row, Field::LastChangePct);
        hit_if(
            (metric(row, Field::LowChangePct) - c.floor_pct).abs() <= PCT_TOLERANCE
                && last > c.floor_pct
                && last < c.max_last_change_pct
                && metric(row, Field::BuyPower) >= c.min_buy_power
                && metric(row, Field::BuyPerCapita) >= c.min_buy_per_capita
                && metric(row, Field::ValueRatio) >= c.min_value_ratio,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("floor_pct", c.floor_pct),
                ("max_last_change_pct", c.max_last_change_pct),
                ("min_buy_power", c.min_buy_power),
                ("min_buy_per_capita", c.min_buy_per_capita),
                ("min_value_ratio", c.min_value_ratio),
            ],
        )?;
        if c.max_last_change_pct <= c.floor_pct {
            return Err(ConfigError::invalid(
                "rules.swing_trade.max_last_change_pct",
                "must be above floor_pct",
            ));
        }
        Ok(())
    }
}
