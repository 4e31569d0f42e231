//! Rules driven by the order book queues.

use crate::rule::{ensure_batch_size, ensure_finite, hit_if, metric, Hit, Rule};
use bourse_tracker_core::config::{CeilingQueueConfig, HeavyBuyQueueConfig};
use bourse_tracker_core::{ConfigError, Field, SnapshotRow};

/// Closed at the upper price limit with a heavy buy queue and an empty sell
/// side.
#[derive(Debug, Clone)]
pub struct CeilingQueue {
    config: CeilingQueueConfig,
}

impl CeilingQueue {
    pub const NAME: &'static str = "ceiling_queue";
    /// Batch size used when none is configured.
    pub const DEFAULT_BATCH_SIZE: usize = 3;

    #[must_use]
    pub fn new(config: CeilingQueueConfig) -> Self {
        Self { config }
    }
}

impl Rule for CeilingQueue {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[
            Field::FinalChangePct,
            Field::SellQueueValue,
            Field::BuyQueueValue,
        ]
    }

    fn rank_field(&self) -> Field {
        Field::BuyQueueValue
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.config.toggle.batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE))
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        hit_if(
            metric(row, Field::FinalChangePct) >= c.price_range_pct
                && metric(row, Field::SellQueueValue) <= c.max_sell_queue_value
                && metric(row, Field::BuyQueueValue) >= c.min_buy_queue_value,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("price_range_pct", c.price_range_pct),
                ("min_buy_queue_value", c.min_buy_queue_value),
                ("max_sell_queue_value", c.max_sell_queue_value),
            ],
        )
    }
}

/// Very large buy queue made of large individual orders.
#[derive(Debug, Clone)]
pub struct HeavyBuyQueue {
    config: HeavyBuyQueueConfig,
}

impl HeavyBuyQueue {
    pub const NAME: &'static str = "heavy_buy_queue";

    #[must_use]
    pub fn new(config: HeavyBuyQueueConfig) -> Self {
        Self { config }
    }
}

impl Rule for HeavyBuyQueue {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        if self.config.require_ceiling {
            &[
                Field::BuyQueueValue,
                Field::BuyQueuePerOrder,
                Field::LastPrice,
                Field::CeilingPrice,
            ]
        } else {
            &[Field::BuyQueueValue, Field::BuyQueuePerOrder]
        }
    }

    fn rank_field(&self) -> Field {
        Field::BuyQueueValue
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        let c = &self.config;
        let at_ceiling = !c.require_ceiling
            || metric(row, Field::LastPrice) >= metric(row, Field::CeilingPrice);
        hit_if(
            metric(row, Field::BuyQueueValue) >= c.min_buy_queue_value
                && metric(row, Field::BuyQueuePerOrder) >= c.min_buy_queue_per_order
                && at_ceiling,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[
                ("min_buy_queue_value", c.min_buy_queue_value),
                ("min_buy_queue_per_order", c.min_buy_queue_per_order),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_queue() {
        let rule = CeilingQueue::new(CeilingQueueConfig::default());
        let row = SnapshotRow::new("AAA")
            .with(Field::FinalChangePct, 5.0)
            .with(Field::SellQueueValue, 0.0)
            .with(Field::BuyQueueValue, 2_000_000_000.0);
        assert!(rule.check(&row).is_some());

        let sellers = row.clone().with(Field::SellQueueValue, 50_000_000.0);
        assert!(rule.check(&sellers).is_none());

        let below_limit = row.with(Field::FinalChangePct, 4.2);
        assert!(rule.check(&below_limit).is_none());
    }

    #[test]
    fn test_heavy_buy_queue_at_ceiling() {
        let rule = HeavyBuyQueue::new(HeavyBuyQueueConfig::default());
        let row = SnapshotRow::new("AAA")
            .with(Field::BuyQueueValue, 12_000_000_000.0)
            .with(Field::BuyQueuePerOrder, 80_000_000.0)
            .with(Field::LastPrice, 1050.0)
            .with(Field::CeilingPrice, 1050.0);
        assert!(rule.check(&row).is_some());

        let under = row.with(Field::LastPrice, 1040.0);
        assert!(rule.check(&under).is_none());
    }

    #[test]
    fn test_heavy_buy_queue_ceiling_optional() {
        let rule = HeavyBuyQueue::new(HeavyBuyQueueConfig {
            require_ceiling: false,
            ..Default::default()
        });
        let row = SnapshotRow::new("AAA")
            .with(Field::BuyQueueValue, 12_000_000_000.0)
            .with(Field::BuyQueuePerOrder, 80_000_000.0);
        assert_eq!(rule.required_fields().len(), 2);
        assert!(rule.check(&row).is_some());
    }
}
