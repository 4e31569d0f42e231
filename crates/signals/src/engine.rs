//! Rule evaluation over a snapshot.
//!
//! Every rule is evaluated independently against every row. Matches are
//! ranked by the rule's ranking key (descending) with the symbol as a
//! tiebreaker, so identical inputs always yield identically ordered output.

use crate::book::RuleBook;
use crate::rule::{EvalContext, Rule};
use bourse_tracker_core::{Match, SnapshotRow};
use std::sync::Arc;
use tracing::{debug, warn};

/// Matches of one rule, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatches {
    pub rule: String,
    pub matches: Vec<Match>,
    /// Rows excluded because a required field was absent.
    pub missing_input: usize,
    /// False when the rule was gated off for this context.
    pub active: bool,
}

/// Evaluation result for the whole rule book, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSet {
    pub rules: Vec<RuleMatches>,
}

impl MatchSet {
    #[must_use]
    pub fn get(&self, rule: &str) -> Option<&RuleMatches> {
        self.rules.iter().find(|r| r.rule == rule)
    }

    #[must_use]
    pub fn total_matches(&self) -> usize {
        self.rules.iter().map(|r| r.matches.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_matches() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleMatches> {
        self.rules.iter()
    }
}

/// Evaluates every rule in the book against the rows.
#[must_use]
pub fn evaluate(rows: &[Arc<SnapshotRow>], book: &RuleBook, ctx: &EvalContext) -> MatchSet {
    let rules = book
        .iter()
        .map(|rule| {
            let result = evaluate_rule(rows, rule, ctx);
            if result.missing_input > 0 {
                warn!(
                    rule = %result.rule,
                    missing = result.missing_input,
                    "Rows excluded for missing input fields"
                );
            }
            debug!(rule = %result.rule, matches = result.matches.len(), active = result.active, "rule evaluated");
            result
        })
        .collect();

    MatchSet { rules }
}

/// Evaluates a single rule.
#[must_use]
pub fn evaluate_rule(rows: &[Arc<SnapshotRow>], rule: &dyn Rule, ctx: &EvalContext) -> RuleMatches {
    let name = rule.name();
    if !rule.is_active(ctx) {
        return RuleMatches {
            rule: name.to_string(),
            matches: Vec::new(),
            missing_input: 0,
            active: false,
        };
    }

    let required = rule.required_fields();
    let rank_field = rule.rank_field();
    let mut matches = Vec::new();
    let mut missing_input = 0;

    for row in rows {
        if !rule.considers(row) {
            continue;
        }
        if !required.iter().all(|f| row.has(*f)) {
            missing_input += 1;
            continue;
        }
        if let Some(hit) = rule.check(row) {
            matches.push(Match {
                symbol: row.symbol.clone(),
                rule: name.to_string(),
                row: Arc::clone(row),
                rank: row.get(rank_field).unwrap_or_default(),
                threshold: hit.threshold,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.rank
            .total_cmp(&a.rank)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    RuleMatches {
        rule: name.to_string(),
        matches,
        missing_input,
        active: true,
    }
}
