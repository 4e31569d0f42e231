//! Signal rules for the bourse alert tracker.
//!
//! Rules are pure predicates over normalized snapshot rows. The engine runs
//! each rule independently and produces a ranked match list per rule.

pub mod book;
pub mod engine;
pub mod rule;
pub mod rules;

pub use book::RuleBook;
pub use engine::{evaluate, evaluate_rule, MatchSet, RuleMatches};
pub use rule::{EvalContext, Hit, Rule};
