//! The ledger document stored remotely.
//!
//! ```json
//! {
//!   "alerts": {
//!     "2026-10-17": [{ "symbol": "AAA", "rule": "strong_buying" }]
//!   },
//!   "daily_summary": { "2026-10-17": true }
//! }
//! ```

use bourse_tracker_core::{DayKey, LedgerEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerDocument {
    /// Delivered (symbol, rule) pairs per day.
    pub alerts: BTreeMap<DayKey, BTreeSet<LedgerEntry>>,
    /// Daily summary gate per day.
    pub daily_summary: BTreeMap<DayKey, bool>,
}

impl LedgerDocument {
    /// Parses stored content. Absent content is an empty document.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for unreadable content.
    pub fn parse(content: Option<&str>) -> Result<Self, serde_json::Error> {
        match content {
            None => Ok(Self::default()),
            Some(s) if s.trim().is_empty() => Ok(Self::default()),
            Some(s) => serde_json::from_str(s),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn contains(&self, day: &DayKey, entry: &LedgerEntry) -> bool {
        self.alerts
            .get(day)
            .is_some_and(|entries| entries.contains(entry))
    }

    /// Entries not yet recorded for `day`, deduplicated.
    #[must_use]
    pub fn missing(&self, day: &DayKey, entries: &[LedgerEntry]) -> BTreeSet<LedgerEntry> {
        entries
            .iter()
            .filter(|e| !self.contains(day, e))
            .cloned()
            .collect()
    }

    /// Adds the missing entries and returns how many were added.
    pub fn insert_all(&mut self, day: &DayKey, entries: &[LedgerEntry]) -> usize {
        let missing = self.missing(day, entries);
        let added = missing.len();
        if added > 0 {
            self.alerts.entry(day.clone()).or_default().extend(missing);
        }
        added
    }

    #[must_use]
    pub fn is_gate_set(&self, day: &DayKey) -> bool {
        self.daily_summary.get(day).copied().unwrap_or(false)
    }

    /// Sets the daily gate and returns 1 if it changed, 0 otherwise.
    pub fn set_gate(&mut self, day: &DayKey) -> usize {
        if self.is_gate_set(day) {
            return 0;
        }
        self.daily_summary.insert(day.clone(), true);
        1
    }

    /// Keeps only the `keep` most recent day partitions in each map.
    /// Returns the number of partitions removed.
    pub fn prune(&mut self, keep: usize) -> usize {
        prune_map(&mut self.alerts, keep) + prune_map(&mut self.daily_summary, keep)
    }

    #[must_use]
    pub fn day_stats(&self, day: &DayKey) -> DayStats {
        let mut stats = DayStats {
            day: day.clone(),
            ..Default::default()
        };
        if let Some(entries) = self.alerts.get(day) {
            for entry in entries {
                stats.total += 1;
                *stats.by_rule.entry(entry.rule.clone()).or_default() += 1;
                *stats.by_symbol.entry(entry.symbol.clone()).or_default() += 1;
            }
        }
        stats
    }
}

fn prune_map<V>(map: &mut BTreeMap<DayKey, V>, keep: usize) -> usize {
    let excess = map.len().saturating_sub(keep);
    if excess == 0 {
        return 0;
    }
    // keys iterate ascending, oldest first
    let stale: Vec<DayKey> = map.keys().take(excess).cloned().collect();
    for key in &stale {
        map.remove(key);
    }
    stale.len()
}

/// Per-day counts over the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayStats {
    pub day: DayKey,
    pub total: usize,
    pub by_rule: BTreeMap<String, usize>,
    /// Number of distinct rules each symbol triggered.
    pub by_symbol: BTreeMap<String, usize>,
}

impl DayStats {
    /// Symbols that triggered at least `min_count` rules, most frequent
    /// first, then by symbol.
    #[must_use]
    pub fn frequent_symbols(&self, min_count: usize) -> Vec<(String, usize)> {
        let mut frequent: Vec<(String, usize)> = self
            .by_symbol
            .iter()
            .filter(|(_, count)| **count >= min_count)
            .map(|(symbol, count)| (symbol.clone(), *count))
            .collect();
        frequent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        frequent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DayKey {
        DayKey::from(s)
    }

    fn entry(symbol: &str, rule: &str) -> LedgerEntry {
        LedgerEntry::new(symbol, rule)
    }

    #[test]
    fn test_parse_absent_and_empty() {
        assert_eq!(LedgerDocument::parse(None).unwrap(), LedgerDocument::default());
        assert_eq!(
            LedgerDocument::parse(Some("  ")).unwrap(),
            LedgerDocument::default()
        );
        assert!(LedgerDocument::parse(Some("{not json")).is_err());
    }

    #[test]
    fn test_insert_all_skips_present_and_duplicates() {
        let d1 = day("2026-10-17");
        let mut doc = LedgerDocument::default();
        assert_eq!(doc.insert_all(&d1, &[entry("AAA", "r1")]), 1);

        let added = doc.insert_all(
            &d1,
            &[entry("AAA", "r1"), entry("BBB", "r1"), entry("BBB", "r1")],
        );

        assert_eq!(added, 1);
        assert_eq!(doc.alerts[&d1].len(), 2);
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let mut doc = LedgerDocument::default();
        for d in ["2026-10-14", "2026-10-15", "2026-10-16", "2026-10-17"] {
            doc.insert_all(&day(d), &[entry("AAA", "r1")]);
            doc.set_gate(&day(d));
        }

        let removed = doc.prune(3);

        assert_eq!(removed, 2);
        let keys: Vec<_> = doc.alerts.keys().map(DayKey::as_str).collect();
        assert_eq!(keys, vec!["2026-10-15", "2026-10-16", "2026-10-17"]);
        assert!(!doc.is_gate_set(&day("2026-10-14")));
        assert_eq!(doc.daily_summary.len(), 3);
    }

    #[test]
    fn test_gate_set_once() {
        let d1 = day("2026-10-17");
        let mut doc = LedgerDocument::default();
        assert_eq!(doc.set_gate(&d1), 1);
        assert_eq!(doc.set_gate(&d1), 0);
        assert!(doc.is_gate_set(&d1));
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let d1 = day("2026-10-17");
        let mut doc = LedgerDocument::default();
        doc.insert_all(&d1, &[entry("AAA", "strong_buying")]);

        let json = doc.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["alerts"]["2026-10-17"][0]["symbol"], "AAA");
        assert_eq!(LedgerDocument::parse(Some(&json)).unwrap(), doc);
    }

    #[test]
    fn test_day_stats_and_frequent_symbols() {
        let d1 = day("2026-10-17");
        let mut doc = LedgerDocument::default();
        doc.insert_all(
            &d1,
            &[
                entry("AAA", "r1"),
                entry("AAA", "r2"),
                entry("BBB", "r1"),
                entry("CCC", "r1"),
                entry("CCC", "r3"),
            ],
        );

        let stats = doc.day_stats(&d1);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_rule["r1"], 3);
        assert_eq!(
            stats.frequent_symbols(2),
            vec![("AAA".to_string(), 2), ("CCC".to_string(), 2)]
        );
        assert_eq!(doc.day_stats(&day("2026-10-16")).total, 0);
    }
}
