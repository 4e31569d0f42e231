//! Rules driven by buyer/seller flow: per-capita trade size, buy power and
//! real money inflow.

use crate::rule::{ensure_batch_size, ensure_finite, hit_if, metric, Hit, Rule};
use bourse_tracker_core::config::{PerCapitaCrossConfig, RealMoneyRatioConfig, StrongBuyingConfig};
use bourse_tracker_core::{ConfigError, Field, SnapshotRow};

/// Heavy trading with strong individual buyers and rising buy power.
#[derive(Debug, Clone)]
pub struct StrongBuying {
    config: StrongBuyingConfig,
}

impl StrongBuying {
    pub const NAME: &'static str = "strong_buying";

    #[must_use]
    pub fn new(config: StrongBuyingConfig) -> Self {
        Self { config }
    }
}

impl Rule for StrongBuying {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        if self.config.require_above_5d_avg {
            &[
                Field::ValueRatio,
                Field::BuyPerCapita,
                Field::BuyPower,
                Field::BuyPower5dAvg,
            ]
        } else {
            &[Field::ValueRatio, Field::BuyPerCapita, Field::BuyPower]
        }
    }

    fn rank_field(&self) -> Field {
        Field::BuyPower
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        let buy_power = metric(row, Field::BuyPower);
        let rising = !c.require_above_5d_avg || buy_power > metric(row, Field::BuyPower5dAvg);
        hit_if(
            metric(row, Field::ValueRatio) > c.min_value_ratio
                && metric(row, Field::BuyPerCapita) > c.min_buy_per_capita
                && buy_power > c.min_buy_power
                && rising,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("min_value_ratio", c.min_value_ratio),
                ("min_buy_per_capita", c.min_buy_per_capita),
                ("min_buy_power", c.min_buy_power),
            ],
        )
    }
}

/// Buy per-capita crossing above sell per-capita on meaningful value.
#[derive(Debug, Clone)]
pub struct PerCapitaCross {
    config: PerCapitaCrossConfig,
}

impl PerCapitaCross {
    pub const NAME: &'static str = "per_capita_cross";

    #[must_use]
    pub fn new(config: PerCapitaCrossConfig) -> Self {
        Self { config }
    }
}

impl Rule for PerCapitaCross {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::BuyPerCapita, Field::SellPerCapita, Field::ValueRatio]
    }

    fn rank_field(&self) -> Field {
        Field::BuyPerCapita
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        hit_if(
            metric(row, Field::BuyPerCapita) > metric(row, Field::SellPerCapita)
                && metric(row, Field::ValueRatio) >= self.config.min_value_ratio,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_batch_size(Self::NAME, self.config.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[("min_value_ratio", self.config.min_value_ratio)],
        )
    }
}

/// Real money inflow that is large relative to the monthly average value.
#[derive(Debug, Clone)]
pub struct RealMoneyRatio {
    config: RealMoneyRatioConfig,
}

impl RealMoneyRatio {
    pub const NAME: &'static str = "real_money_ratio";
    /// Batch size used when none is configured.
    pub const DEFAULT_BATCH_SIZE: usize = 3;

    #[must_use]
    pub fn new(config: RealMoneyRatioConfig) -> Self {
        Self { config }
    }
}

impl Rule for RealMoneyRatio {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::RealMoneyRatio, Field::BuyPerCapita, Field::BuyPower]
    }

    fn rank_field(&self) -> Field {
        Field::RealMoneyRatio
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.config.toggle.batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE))
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        hit_if(
            metric(row, Field::RealMoneyRatio) >= c.min_ratio
                && metric(row, Field::BuyPerCapita) >= c.min_buy_per_capita
                && metric(row, Field::BuyPower) >= c.min_buy_power,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("min_ratio", c.min_ratio),
                ("min_buy_per_capita", c.min_buy_per_capita),
                ("min_buy_power", c.min_buy_power),
            ],
        )
    }
}
