//! The rule abstraction evaluated by the engine.

use bourse_tracker_core::{ConfigError, Field, SnapshotRow};

/// Inputs to evaluation that are not part of the snapshot.
///
/// Time-of-day is injected here so hour-gated rules stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    /// Local wall-clock hour at the exchange (0..24).
    pub current_hour: u32,
}

impl EvalContext {
    #[must_use]
    pub const fn at_hour(current_hour: u32) -> Self {
        Self { current_hour }
    }
}

/// Outcome of a predicate that held.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hit {
    /// The threshold the row breached, when it varies per symbol.
    pub threshold: Option<f64>,
}

/// A named predicate over a snapshot row.
///
/// The engine calls [`Rule::considers`], then checks that every field in
/// [`Rule::required_fields`] is present, and only then calls
/// [`Rule::check`]. `check` may therefore read required fields with
/// [`metric`].
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn required_fields(&self) -> &'static [Field];

    /// Field the matches are ranked by, descending.
    fn rank_field(&self) -> Field;

    /// Per-rule batch size override.
    fn batch_size(&self) -> Option<usize> {
        None
    }

    /// Whether the rule is active at all in this context.
    fn is_active(&self, _ctx: &EvalContext) -> bool {
        true
    }

    /// Whether the row is in this rule's universe. Rows outside it are
    /// neither matched nor counted as missing input.
    fn considers(&self, _row: &SnapshotRow) -> bool {
        true
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit>;

    /// Validates thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending setting.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Reads a field the engine has already checked for presence.
#[must_use]
pub fn metric(row: &SnapshotRow, field: Field) -> f64 {
    row.get(field).unwrap_or_default()
}

/// Returns `Hit::default()` when `cond` holds.
#[must_use]
pub fn hit_if(cond: bool) -> Option<Hit> {
    cond.then(Hit::default)
}

/// Fails unless every threshold is finite.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for the first non-finite value.
pub fn ensure_finite(rule: &str, values: &[(&str, f64)]) -> Result<(), ConfigError> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(ConfigError::invalid(
                format!("rules.{rule}.{name}"),
                format!("{value} is not a finite number"),
            ));
        }
    }
    Ok(())
}

/// Fails on a zero batch size override.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when `batch_size` is `Some(0)`.
pub fn ensure_batch_size(rule: &str, batch_size: Option<usize>) -> Result<(), ConfigError> {
    if batch_size == Some(0) {
        return Err(ConfigError::invalid(
            format!("rules.{rule}.batch_size"),
            "must be at least 1",
        ));
    }
    Ok(())
}
