//! Snapshot rows, rule matches, and ledger entries.
//!
//! Every metric on a [`SnapshotRow`] is an `Option<f64>`: `None` means the
//! upstream providers never supplied the field, so consumers check presence
//! once through [`SnapshotRow::get`] instead of probing raw records.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A numeric attribute of a snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    LastPrice,
    LastChangePct,
    FinalPrice,
    FinalChangePct,
    FirstPrice,
    LowPrice,
    LowChangePct,
    CeilingPrice,
    Volume,
    Value,
    AvgMonthlyValue,
    BuyPerCapita,
    SellPerCapita,
    BuyPower,
    BuyPower5dAvg,
    RealMoneyInflow,
    BuyQueueValue,
    BuyQueueOrders,
    SellQueueValue,
    /// Derived: value / avg_monthly_value.
    ValueRatio,
    /// Derived: real_money_inflow / avg_monthly_value.
    RealMoneyRatio,
    /// Derived: last_change_pct - final_change_pct.
    TickDiff,
    /// Derived: buy_queue_value / buy_queue_orders.
    BuyQueuePerOrder,
}

impl Field {
    /// Canonical snake_case name, also the primary record key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LastPrice => "last_price",
            Self::LastChangePct => "last_change_pct",
            Self::FinalPrice => "final_price",
            Self::FinalChangePct => "final_change_pct",
            Self::FirstPrice => "first_price",
            Self::LowPrice => "low_price",
            Self::LowChangePct => "low_change_pct",
            Self::CeilingPrice => "ceiling_price",
            Self::Volume => "volume",
            Self::Value => "value",
            Self::AvgMonthlyValue => "avg_monthly_value",
            Self::BuyPerCapita => "buy_per_capita",
            Self::SellPerCapita => "sell_per_capita",
            Self::BuyPower => "buy_power",
            Self::BuyPower5dAvg => "buy_power_5d_avg",
            Self::RealMoneyInflow => "real_money_inflow",
            Self::BuyQueueValue => "buy_queue_value",
            Self::BuyQueueOrders => "buy_queue_orders",
            Self::SellQueueValue => "sell_queue_value",
            Self::ValueRatio => "value_ratio",
            Self::RealMoneyRatio => "real_money_ratio",
            Self::TickDiff => "tick_diff",
            Self::BuyQueuePerOrder => "buy_queue_per_order",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Division that never yields NaN or infinity: a zero or non-finite
/// denominator gives `0.0`.
#[must_use]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// One symbol's state at fetch time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub symbol: String,
    pub industry: Option<String>,
    pub last_price: Option<f64>,
    pub last_change_pct: Option<f64>,
    pub final_price: Option<f64>,
    pub final_change_pct: Option<f64>,
    pub first_price: Option<f64>,
    pub low_price: Option<f64>,
    pub low_change_pct: Option<f64>,
    pub ceiling_price: Option<f64>,
    pub volume: Option<f64>,
    pub value: Option<f64>,
    pub avg_monthly_value: Option<f64>,
    pub buy_per_capita: Option<f64>,
    pub sell_per_capita: Option<f64>,
    pub buy_power: Option<f64>,
    pub buy_power_5d_avg: Option<f64>,
    pub real_money_inflow: Option<f64>,
    pub buy_queue_value: Option<f64>,
    pub buy_queue_orders: Option<f64>,
    pub sell_queue_value: Option<f64>,
    pub value_ratio: Option<f64>,
    pub real_money_ratio: Option<f64>,
    pub tick_diff: Option<f64>,
    pub buy_queue_per_order: Option<f64>,
}

impl SnapshotRow {
    /// Creates an empty row for `symbol`.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Sets a field and returns the row.
    #[must_use]
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::LastPrice => self.last_price,
            Field::LastChangePct => self.last_change_pct,
            Field::FinalPrice => self.final_price,
            Field::FinalChangePct => self.final_change_pct,
            Field::FirstPrice => self.first_price,
            Field::LowPrice => self.low_price,
            Field::LowChangePct => self.low_change_pct,
            Field::CeilingPrice => self.ceiling_price,
            Field::Volume => self.volume,
            Field::Value => self.value,
            Field::AvgMonthlyValue => self.avg_monthly_value,
            Field::BuyPerCapita => self.buy_per_capita,
            Field::SellPerCapita => self.sell_per_capita,
            Field::BuyPower => self.buy_power,
            Field::BuyPower5dAvg => self.buy_power_5d_avg,
            Field::RealMoneyInflow => self.real_money_inflow,
            Field::BuyQueueValue => self.buy_queue_value,
            Field::BuyQueueOrders => self.buy_queue_orders,
            Field::SellQueueValue => self.sell_queue_value,
            Field::ValueRatio => self.value_ratio,
            Field::RealMoneyRatio => self.real_money_ratio,
            Field::TickDiff => self.tick_diff,
            Field::BuyQueuePerOrder => self.buy_queue_per_order,
        }
    }

    /// Sets the value of a field.
    pub fn set(&mut self, field: Field, value: f64) {
        *self.slot_mut(field) = Some(value);
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<f64> {
        match field {
            Field::LastPrice => &mut self.last_price,
            Field::LastChangePct => &mut self.last_change_pct,
            Field::FinalPrice => &mut self.final_price,
            Field::FinalChangePct => &mut self.final_change_pct,
            Field::FirstPrice => &mut self.first_price,
            Field::LowPrice => &mut self.low_price,
            Field::LowChangePct => &mut self.low_change_pct,
            Field::CeilingPrice => &mut self.ceiling_price,
            Field::Volume => &mut self.volume,
            Field::Value => &mut self.value,
            Field::AvgMonthlyValue => &mut self.avg_monthly_value,
            Field::BuyPerCapita => &mut self.buy_per_capita,
            Field::SellPerCapita => &mut self.sell_per_capita,
            Field::BuyPower => &mut self.buy_power,
            Field::BuyPower5dAvg => &mut self.buy_power_5d_avg,
            Field::RealMoneyInflow => &mut self.real_money_inflow,
            Field::BuyQueueValue => &mut self.buy_queue_value,
            Field::BuyQueueOrders => &mut self.buy_queue_orders,
            Field::SellQueueValue => &mut self.sell_queue_value,
            Field::ValueRatio => &mut self.value_ratio,
            Field::RealMoneyRatio => &mut self.real_money_ratio,
            Field::TickDiff => &mut self.tick_diff,
            Field::BuyQueuePerOrder => &mut self.buy_queue_per_order,
        }
    }

    /// Fills the derived ratio fields that are still absent.
    ///
    /// A derived field stays `None` when any of its inputs is missing. A ratio
    /// supplied directly by a provider is kept as is.
    pub fn derive_ratios(&mut self) {
        if self.value_ratio.is_none() {
            self.value_ratio = ratio_of(self.value, self.avg_monthly_value);
        }
        if self.real_money_ratio.is_none() {
            self.real_money_ratio = ratio_of(self.real_money_inflow, self.avg_monthly_value);
        }
        if self.tick_diff.is_none() {
            if let (Some(last), Some(close)) = (self.last_change_pct, self.final_change_pct) {
                self.tick_diff = Some(last - close);
            }
        }
        if self.buy_queue_per_order.is_none() {
            self.buy_queue_per_order = ratio_of(self.buy_queue_value, self.buy_queue_orders);
        }
    }
}

fn ratio_of(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    Some(safe_ratio(numerator?, denominator?))
}

/// One rule firing on one row within a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub symbol: String,
    pub rule: String,
    pub row: Arc<SnapshotRow>,
    /// Value of the rule's ranking key for this row.
    pub rank: f64,
    /// Breached threshold, for rules with per-symbol thresholds.
    pub threshold: Option<f64>,
}

impl Match {
    /// The ledger entry recorded once this match is delivered.
    #[must_use]
    pub fn entry(&self) -> LedgerEntry {
        LedgerEntry::new(&self.symbol, &self.rule)
    }
}

/// "This symbol already triggered this rule" within one day partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub symbol: String,
    pub rule: String,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(symbol: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.rule)
    }
}

/// Calendar-day partition identifier (`YYYY-MM-DD`).
///
/// Lexicographic order equals chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    /// Day key of an instant in its own timezone.
    #[must_use]
    pub fn for_instant<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from_date(instant.date_naive())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DayKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ratio_zero_denominator() {
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(5.0, f64::NAN), 0.0);
        assert_eq!(safe_ratio(6.0, 3.0), 2.0);
    }

    const RAW_FIELDS: [Field; 19] = [
        Field::LastPrice,
        Field::LastChangePct,
        Field::FinalPrice,
        Field::FinalChangePct,
        Field::FirstPrice,
        Field::LowPrice,
        Field::LowChangePct,
        Field::CeilingPrice,
        Field::Volume,
        Field::Value,
        Field::AvgMonthlyValue,
        Field::BuyPerCapita,
        Field::SellPerCapita,
        Field::BuyPower,
        Field::BuyPower5dAvg,
        Field::RealMoneyInflow,
        Field::BuyQueueValue,
        Field::BuyQueueOrders,
        Field::SellQueueValue,
    ];

    #[test]
    fn test_get_and_set_roundtrip_all_fields() {
        let mut row = SnapshotRow::new("AAA");
        for (i, field) in RAW_FIELDS.iter().enumerate() {
            row.set(*field, i as f64);
        }
        for (i, field) in RAW_FIELDS.iter().enumerate() {
            assert_eq!(row.get(*field), Some(i as f64), "field {field}");
        }
    }

    #[test]
    fn test_derive_ratios() {
        let mut row = SnapshotRow::new("AAA")
            .with(Field::Value, 30.0)
            .with(Field::AvgMonthlyValue, 20.0)
            .with(Field::RealMoneyInflow, 10.0)
            .with(Field::LastChangePct, 4.0)
            .with(Field::FinalChangePct, 1.5)
            .with(Field::BuyQueueValue, 100.0)
            .with(Field::BuyQueueOrders, 0.0);
        row.derive_ratios();

        assert_eq!(row.value_ratio, Some(1.5));
        assert_eq!(row.real_money_ratio, Some(0.5));
        assert_eq!(row.tick_diff, Some(2.5));
        // zero order count never produces NaN
        assert_eq!(row.buy_queue_per_order, Some(0.0));
    }

    #[test]
    fn test_derive_ratios_missing_inputs_stay_absent() {
        let mut row = SnapshotRow::new("AAA").with(Field::Value, 30.0);
        row.derive_ratios();
        assert_eq!(row.value_ratio, None);
        assert_eq!(row.tick_diff, None);
    }

    #[test]
    fn test_derive_ratios_keeps_supplied_ratio() {
        let mut row = SnapshotRow::new("AAA")
            .with(Field::ValueRatio, 1.6)
            .with(Field::Value, 10.0)
            .with(Field::AvgMonthlyValue, 100.0);
        row.derive_ratios();
        assert_eq!(row.value_ratio, Some(1.6));
    }

    #[test]
    fn test_day_key_ordering() {
        let a = DayKey::from_date(NaiveDate::from_ymd_opt(2026, 9, 30).unwrap());
        let b = DayKey::from_date(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert!(a < b);
        assert_eq!(b.as_str(), "2026-10-01");
    }

    #[test]
    fn test_ledger_entry_display() {
        let entry = LedgerEntry::new("AAA", "strong_buying");
        assert_eq!(entry.to_string(), "AAA/strong_buying");
    }
}
