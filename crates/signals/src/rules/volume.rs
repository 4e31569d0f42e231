//! Rules driven by traded value against the monthly average.

use crate::rule::{ensure_batch_size, ensure_finite, hit_if, metric, EvalContext, Hit, Rule};
use bourse_tracker_core::config::{FirstHourConfig, SuspiciousVolumeConfig};
use bourse_tracker_core::{ConfigError, Field, SnapshotRow};

#[derive(Debug, Clone)]
pub struct SuspiciousVolume {
    config: SuspiciousVolumeConfig,
}

impl SuspiciousVolume {
    pub const NAME: &'static str = "suspicious_volume";

    #[must_use]
    pub fn new(config: SuspiciousVolumeConfig) -> Self {
        Self { config }
    }
}

impl Rule for SuspiciousVolume {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::ValueRatio]
    }

    fn rank_field(&self) -> Field {
        Field::ValueRatio
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        hit_if(metric(row, Field::ValueRatio) > self.config.min_value_ratio)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_batch_size(Self::NAME, self.config.toggle.batch_size)?;
        ensure_finite(
            Self::NAME,
            &[("min_value_ratio", self.config.min_value_ratio)],
        )
    }
}

/// Early heavy trading. Only fires inside the configured hour window.
#[derive(Debug, Clone)]
pub struct FirstHour {
    config: FirstHourConfig,
}

impl FirstHour {
    pub const NAME: &'static str = "first_hour";

    #[must_use]
    pub fn new(config: FirstHourConfig) -> Self {
        Self { config }
    }
}

impl Rule for FirstHour {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn required_fields(&self) -> &'static [Field] {
        &[Field::ValueRatio]
    }

    fn rank_field(&self) -> Field {
        Field::ValueRatio
    }

    fn batch_size(&self) -> Option<usize> {
        self.config.toggle.batch_size
    }

    fn is_active(&self, ctx: &EvalContext) -> bool {
        (self.config.start_hour..self.config.end_hour).contains(&ctx.current_hour)
    }

    fn check(&self, row: &SnapshotRow) -> Option<Hit> {
        hit_if(metric(row, Field::ValueRatio) >= self.config.min_value_ratio)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        ensure_batch_size(Self::NAME, c.toggle.batch_size)?;
        ensure_finite(Self::NAME, &[("min_value_ratio", c.min_value_ratio)])?;
        if c.start_hour >= c.end_hour || c.end_hour > 24 {
            return Err(ConfigError::invalid(
                "rules.first_hour",
                format!(
                    "hour window {}..{} is empty or out of range",
                    c.start_hour, c.end_hour
                ),
            ));
        }
        Ok(())
    }
}
