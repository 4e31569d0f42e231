//! Rule book: the ordered, validated set of rules for a run.

use crate::rule::Rule;
use crate::rules::{
    CeilingQueue, FirstHour, HeavyBuyQueue, PerCapitaCross, RealMoneyRatio, StrongBuying,
    SuspiciousVolume, SwingTrade, TickTime, Watchlist,
};
use bourse_tracker_core::{ConfigError, RulesConfig};
use tracing::{error, info};

/// Rules in declaration order. Built once at startup and never mutated
/// during a run.
#[derive(Default)]
pub struct RuleBook {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the full rule bank from configuration.
    ///
    /// Disabled rules are left out. A rule with invalid settings is skipped
    /// with an error log; the remaining rules still load.
    #[must_use]
    pub fn from_config(config: &RulesConfig) -> Self {
        let candidates: Vec<(bool, Box<dyn Rule>)> = vec![
            (
                config.strong_buying.toggle.enabled,
                Box::new(StrongBuying::new(config.strong_buying.clone())),
            ),
            (
                config.per_capita_cross.toggle.enabled,
                Box::new(PerCapitaCross::new(config.per_capita_cross.clone())),
            ),
            (
                config.watchlist.toggle.enabled,
                Box::new(Watchlist::new(config.watchlist.clone())),
            ),
            (
                config.ceiling_queue.toggle.enabled,
                Box::new(CeilingQueue::new(config.ceiling_queue.clone())),
            ),
            (
                config.real_money_ratio.toggle.enabled,
                Box::new(RealMoneyRatio::new(config.real_money_ratio.clone())),
            ),
            (
                config.tick_time.toggle.enabled,
                Box::new(TickTime::new(config.tick_time.clone())),
            ),
            (
                config.suspicious_volume.toggle.enabled,
                Box::new(SuspiciousVolume::new(config.suspicious_volume.clone())),
            ),
            (
                config.swing_trade.toggle.enabled,
                Box::new(SwingTrade::new(config.swing_trade.clone())),
            ),
            (
                config.first_hour.toggle.enabled,
                Box::new(FirstHour::new(config.first_hour.clone())),
            ),
            (
                config.heavy_buy_queue.toggle.enabled,
                Box::new(HeavyBuyQueue::new(config.heavy_buy_queue.clone())),
            ),
        ];

        let mut book = Self::new();
        for (enabled, rule) in candidates {
            let name = rule.name();
            if !enabled {
                info!(rule = name, "Rule disabled");
                continue;
            }
            if let Err(e) = book.register(rule) {
                error!(rule = name, error = %e, "Invalid rule configuration, skipping rule");
            }
        }
        book
    }

    /// Validates and appends a rule.
    ///
    /// # Errors
    ///
    /// Returns the rule's validation error, or [`ConfigError::Invalid`] if a
    /// rule with the same name is already registered.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), ConfigError> {
        rule.validate()?;
        if self.contains(rule.name()) {
            return Err(ConfigError::invalid(
                format!("rules.{}", rule.name()),
                "duplicate rule name",
            ));
        }
        self.rules.push(rule);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.name() == name)
            .map(|b| b.as_ref())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rule names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Batch size override for a rule, if any.
    #[must_use]
    pub fn batch_size(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(|r| r.batch_size())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|b| b.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleBook")
            .field("rules", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_book_has_all_rules_in_order() {
        let book = RuleBook::from_config(&RulesConfig::default());
        assert_eq!(
            book.names(),
            vec![
                "strong_buying",
                "per_capita_cross",
                "watchlist",
                "ceiling_queue",
                "real_money_ratio",
                "tick_time",
                "suspicious_volume",
                "swing_trade",
                "first_hour",
                "heavy_buy_queue",
            ]
        );
        assert_eq!(book.batch_size("ceiling_queue"), Some(3));
        assert_eq!(book.batch_size("strong_buying"), None);
    }

    #[test]
    fn test_invalid_rule_skipped_others_kept() {
        let mut config = RulesConfig::default();
        config.watchlist.symbols = BTreeMap::new();
        config.first_hour.toggle.enabled = false;

        let book = RuleBook::from_config(&config);

        assert_eq!(book.len(), 8);
        assert!(!book.contains("watchlist"));
        assert!(!book.contains("first_hour"));
        assert!(book.contains("strong_buying"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut book = RuleBook::new();
        book.register(Box::new(SuspiciousVolume::new(Default::default())))
            .unwrap();
        let err = book
            .register(Box::new(SuspiciousVolume::new(Default::default())))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
