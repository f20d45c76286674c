//! Tunable thresholds for a reconciliation run

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::ConfigurationError;

/// Flat set of named tunables supplied at invocation time
///
/// All percentages are expressed in percent (`0.5` is half a percent). Every
/// field can be overridden on its own; missing fields fall back to
/// [`ReconciliationConfig::default`] when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Tax-rate delta in percentage points strictly above which a break is raised
    pub tax_rate_threshold_pct: BigDecimal,
    /// Relative FX delta strictly above which a break is raised
    pub fx_tolerance_pct: BigDecimal,
    /// Absolute impact at or above which a break is CRITICAL
    pub high_impact_threshold: BigDecimal,
    /// Relative amount delta strictly above which a break is raised
    pub amount_relative_tolerance_pct: BigDecimal,
    /// Relative amount delta at or above which a break is HIGH
    pub high_relative_delta_pct: BigDecimal,
    /// Days a custodian payment may trail the internal pay date before it is a settlement delay
    pub settlement_delay_days: i64,
    /// Worker pool size; 0 uses one worker per CPU
    pub max_workers: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tax_rate_threshold_pct: BigDecimal::from(1),
            fx_tolerance_pct: BigDecimal::new(5.into(), 1),
            high_impact_threshold: BigDecimal::from(100_000),
            amount_relative_tolerance_pct: BigDecimal::new(1.into(), 2),
            high_relative_delta_pct: BigDecimal::from(5),
            settlement_delay_days: 5,
            max_workers: 0,
        }
    }
}

impl ReconciliationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tax_rate_threshold_pct(mut self, value: BigDecimal) -> Self {
        self.tax_rate_threshold_pct = value;
        self
    }

    pub fn with_fx_tolerance_pct(mut self, value: BigDecimal) -> Self {
        self.fx_tolerance_pct = value;
        self
    }

    pub fn with_high_impact_threshold(mut self, value: BigDecimal) -> Self {
        self.high_impact_threshold = value;
        self
    }

    pub fn with_amount_relative_tolerance_pct(mut self, value: BigDecimal) -> Self {
        self.amount_relative_tolerance_pct = value;
        self
    }

    pub fn with_high_relative_delta_pct(mut self, value: BigDecimal) -> Self {
        self.high_relative_delta_pct = value;
        self
    }

    pub fn with_settlement_delay_days(mut self, days: i64) -> Self {
        self.settlement_delay_days = days;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Reject values that would silently skew the reported risk
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let zero = BigDecimal::from(0);

        for (name, value) in [
            ("tax_rate_threshold_pct", &self.tax_rate_threshold_pct),
            ("fx_tolerance_pct", &self.fx_tolerance_pct),
            ("high_impact_threshold", &self.high_impact_threshold),
            ("amount_relative_tolerance_pct", &self.amount_relative_tolerance_pct),
            ("high_relative_delta_pct", &self.high_relative_delta_pct),
        ] {
            if *value < zero {
                return Err(ConfigurationError::new(
                    name,
                    format!("must not be negative, got {}", value),
                ));
            }
        }

        if self.settlement_delay_days < 0 {
            return Err(ConfigurationError::new(
                "settlement_delay_days",
                format!("must not be negative, got {}", self.settlement_delay_days),
            ));
        }

        if self.high_relative_delta_pct < self.amount_relative_tolerance_pct {
            return Err(ConfigurationError::new(
                "high_relative_delta_pct",
                format!(
                    "must be at least amount_relative_tolerance_pct ({} < {})",
                    self.high_relative_delta_pct, self.amount_relative_tolerance_pct
                ),
            ));
        }

        Ok(())
    }
}
