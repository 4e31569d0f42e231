//! Raw provider records to canonical snapshot rows.
//!
//! Field names are resolved through an alias table so providers with
//! different vocabularies feed the same row. Coercion never fails:
//!
//! - a key that no provider supplied leaves the field `None`,
//! - a present but null or non-numeric value becomes `0.0` and is counted,
//! - a record without a resolvable symbol is dropped and counted.
//!
//! Records for the same symbol merge into one row; the first record that
//! supplies a field wins. Derived ratios are computed once, after merging.

use bourse_tracker_core::{Field, RawRecord, SnapshotRow};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const SYMBOL_KEYS: &[&str] = &["symbol", "l18", "nemad"];
const INDUSTRY_KEYS: &[&str] = &["industry", "industry_name", "cs"];

/// Accepted record keys per field, canonical name first.
fn aliases(field: Field) -> &'static [&'static str] {
    match field {
        Field::LastPrice => &["last_price", "pl"],
        Field::LastChangePct => &["last_change_pct", "last_price_change_percent", "plp"],
        Field::FinalPrice => &["final_price", "pc"],
        Field::FinalChangePct => &["final_change_pct", "final_price_change_percent", "pcp"],
        Field::FirstPrice => &["first_price", "pf"],
        Field::LowPrice => &["low_price", "pmin"],
        Field::LowChangePct => &["low_change_pct", "low_price_change_percent"],
        Field::CeilingPrice => &["ceiling_price", "tmax", "max_allowed_price"],
        Field::Volume => &["volume", "tvol"],
        Field::Value => &["value", "tval"],
        Field::AvgMonthlyValue => &["avg_monthly_value", "monthly_avg_value"],
        Field::BuyPerCapita => &["buy_per_capita", "sarane_kharid"],
        Field::SellPerCapita => &["sell_per_capita", "sarane_forosh"],
        Field::BuyPower => &["buy_power", "godrat_kharid"],
        Field::BuyPower5dAvg => &["buy_power_5d_avg", "5_day_godrat_kharid"],
        Field::RealMoneyInflow => &["real_money_inflow", "pol_hagigi"],
        Field::BuyQueueValue => &["buy_queue_value", "buy_order_value"],
        Field::BuyQueueOrders => &["buy_queue_orders", "buy_order_count", "zd1"],
        Field::SellQueueValue => &["sell_queue_value", "sell_order_value"],
        Field::ValueRatio => &["value_ratio", "value_to_avg_monthly_value"],
        Field::RealMoneyRatio => &["real_money_ratio", "pol_hagigi_to_avg_monthly_value"],
        Field::TickDiff => &["tick_diff"],
        Field::BuyQueuePerOrder => &["buy_queue_per_order"],
    }
}

/// Fields a provider may supply: raw metrics plus pre-computed ratios.
const INPUT_FIELDS: [Field; 21] = [
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
    Field::ValueRatio,
    Field::RealMoneyRatio,
];

/// Normalization diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub records_in: usize,
    pub rows_out: usize,
    /// Records without a resolvable symbol.
    pub dropped_no_symbol: usize,
    /// Present values that were null or non-numeric and became `0.0`.
    pub coerced_values: usize,
}

/// The normalized table of one fetch cycle, ordered by symbol.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub rows: Vec<Arc<SnapshotRow>>,
    pub report: NormalizeReport,
}

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds a snapshot from records given in merge priority order.
#[must_use]
pub fn normalize<'a, I>(records: I) -> Snapshot
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut report = NormalizeReport::default();
    let mut rows: BTreeMap<String, SnapshotRow> = BTreeMap::new();

    for record in records {
        report.records_in += 1;

        let Some(symbol) = resolve_symbol(record) else {
            report.dropped_no_symbol += 1;
            continue;
        };

        let row = rows
            .entry(symbol.clone())
            .or_insert_with(|| SnapshotRow::new(symbol));

        if row.industry.is_none() {
            row.industry = lookup(record, INDUSTRY_KEYS).and_then(text_of);
        }

        for field in INPUT_FIELDS {
            if row.has(field) {
                continue;
            }
            if let Some(value) = lookup(record, aliases(field)) {
                let (number, coerced) = coerce(value);
                if coerced {
                    report.coerced_values += 1;
                }
                row.set(field, number);
            }
        }
    }

    let rows: Vec<Arc<SnapshotRow>> = rows
        .into_values()
        .map(|mut row| {
            row.derive_ratios();
            Arc::new(row)
        })
        .collect();

    report.rows_out = rows.len();
    if report.dropped_no_symbol > 0 || report.coerced_values > 0 {
        tracing::warn!(
            dropped_no_symbol = report.dropped_no_symbol,
            coerced_values = report.coerced_values,
            "Snapshot normalization degraded some records"
        );
    }
    tracing::debug!(records = report.records_in, rows = report.rows_out, "normalized snapshot");

    Snapshot { rows, report }
}

fn lookup<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| record.get(*key))
}

fn resolve_symbol(record: &RawRecord) -> Option<String> {
    lookup(record, SYMBOL_KEYS)
        .and_then(text_of)
        .filter(|s| !s.is_empty())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the numeric value and whether it had to be coerced to neutral.
fn coerce(value: &Value) -> (f64, bool) {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => (v, false),
        _ => (0.0, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_aliases_resolve_to_fields() {
        let records = vec![record(json!({
            "l18": "AAA",
            "cs": "Steel",
            "pl": 1200,
            "sarane_kharid": 60.0,
            "godrat_kharid": "1.2",
            "tval": "3,000",
            "avg_monthly_value": 2000
        }))];

        let snapshot = normalize(&records);
        let row = &snapshot.rows[0];

        assert_eq!(row.symbol, "AAA");
        assert_eq!(row.industry.as_deref(), Some("Steel"));
        assert_eq!(row.last_price, Some(1200.0));
        assert_eq!(row.buy_per_capita, Some(60.0));
        assert_eq!(row.buy_power, Some(1.2));
        assert_eq!(row.value, Some(3000.0));
        assert_eq!(row.value_ratio, Some(1.5));
        assert_eq!(snapshot.report.coerced_values, 0);
    }

    #[test]
    fn test_missing_symbol_dropped_and_counted() {
        let records = vec![
            record(json!({"pl": 10})),
            record(json!({"symbol": "", "pl": 10})),
            record(json!({"symbol": "BBB", "pl": 10})),
        ];

        let snapshot = normalize(&records);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.report.dropped_no_symbol, 2);
        assert_eq!(snapshot.report.records_in, 3);
    }

    #[test]
    fn test_non_numeric_values_coerced_to_neutral() {
        let records = vec![record(json!({
            "symbol": "AAA",
            "pl": "n/a",
            "buy_power": null,
            "value": 100
        }))];

        let snapshot = normalize(&records);
        let row = &snapshot.rows[0];

        assert_eq!(row.last_price, Some(0.0));
        assert_eq!(row.buy_power, Some(0.0));
        assert_eq!(row.sell_per_capita, None);
        assert_eq!(snapshot.report.coerced_values, 2);
    }

    #[test]
    fn test_zero_denominator_gives_zero_ratio() {
        let records = vec![record(json!({
            "symbol": "AAA",
            "value": 100,
            "avg_monthly_value": 0
        }))];

        let snapshot = normalize(&records);
        assert_eq!(snapshot.rows[0].value_ratio, Some(0.0));
    }

    #[test]
    fn test_merge_first_provider_wins() {
        let records = vec![
            record(json!({"symbol": "AAA", "pl": 100, "value": 10})),
            record(json!({"l18": "AAA", "pl": 999, "buy_queue_value": 5})),
        ];

        let snapshot = normalize(&records);

        assert_eq!(snapshot.len(), 1);
        let row = &snapshot.rows[0];
        assert_eq!(row.last_price, Some(100.0));
        assert_eq!(row.buy_queue_value, Some(5.0));
    }

    #[test]
    fn test_supplied_ratio_kept() {
        let records = vec![record(json!({
            "symbol": "AAA",
            "value_to_avg_monthly_value": 1.6,
            "value": 1,
            "avg_monthly_value": 100
        }))];

        let snapshot = normalize(&records);
        assert_eq!(snapshot.rows[0].value_ratio, Some(1.6));
    }

    #[test]
    fn test_rows_ordered_by_symbol() {
        let records = vec![
            record(json!({"symbol": "CCC"})),
            record(json!({"symbol": "AAA"})),
            record(json!({"symbol": "BBB"})),
        ];

        let snapshot = normalize(&records);
        let symbols: Vec<_> = snapshot.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB", "CCC"]);
    }
}
