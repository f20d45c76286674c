//! Field comparators, one per financial dimension
//!
//! Every comparator looks at a single field of a [`MatchedEventPair`] in the
//! records' native settlement currency and reports at most one
//! [`FieldDiscrepancy`]. Nothing is ever converted to a common currency.

pub mod amount;
pub mod dates;
pub mod fx;
pub mod position;
pub mod tax;

pub use amount::*;
pub use dates::*;
pub use fx::*;
pub use position::*;
pub use tax::*;

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::reconciliation::ReconciliationConfig;
use crate::traits::FieldComparator;
use crate::types::*;

/// Floor for the denominator of relative deltas
pub const RELATIVE_DELTA_EPSILON: &str = "0.000000001";

/// Decimal places kept on reported relative deltas
const RELATIVE_DELTA_SCALE: i64 = 6;

/// Tolerances the comparators need, taken from the run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonContext {
    pub amount_relative_tolerance_pct: BigDecimal,
    pub tax_rate_threshold_pct: BigDecimal,
    pub fx_tolerance_pct: BigDecimal,
}

impl ComparisonContext {
    pub fn from_config(config: &ReconciliationConfig) -> Self {
        Self {
            amount_relative_tolerance_pct: config.amount_relative_tolerance_pct.clone(),
            tax_rate_threshold_pct: config.tax_rate_threshold_pct.clone(),
            fx_tolerance_pct: config.fx_tolerance_pct.clone(),
        }
    }
}

impl Default for ComparisonContext {
    fn default() -> Self {
        Self::from_config(&ReconciliationConfig::default())
    }
}

/// The comparator set used when none is supplied
pub fn default_comparators() -> Vec<Box<dyn FieldComparator>> {
    vec![
        Box::new(AmountComparator::net()),
        Box::new(AmountComparator::gross()),
        Box::new(SharesComparator),
        Box::new(TaxRateComparator),
        Box::new(FxRateComparator),
        Box::new(DateComparator::ex_date()),
        Box::new(DateComparator::pay_date()),
    ]
}

fn epsilon() -> BigDecimal {
    BigDecimal::from_str(RELATIVE_DELTA_EPSILON).unwrap_or_else(|_| BigDecimal::from(0))
}

/// |internal - custodian| as a percentage of |internal|; `None` for a zero base
///
/// Rounded for reporting; severity cut-offs are evaluated on the exact ratio.
pub fn relative_delta_pct(internal: &BigDecimal, custodian: &BigDecimal) -> Option<BigDecimal> {
    let base = internal.abs();
    if base == BigDecimal::from(0) {
        return None;
    }
    let delta = (internal - custodian).abs();
    Some((delta * BigDecimal::from(100) / base).round(RELATIVE_DELTA_SCALE))
}

/// Whether the relative delta is strictly beyond `tolerance_pct`
///
/// The denominator is `max(|internal|, epsilon)`, so a zero base with a
/// nonzero counterpart is always beyond tolerance.
pub fn exceeds_relative_tolerance(
    internal: &BigDecimal,
    custodian: &BigDecimal,
    tolerance_pct: &BigDecimal,
) -> bool {
    let delta = (internal - custodian).abs();
    if delta == BigDecimal::from(0) {
        return false;
    }

    let base = internal.abs().max(epsilon());
    delta * BigDecimal::from(100) > tolerance_pct * &base
}

/// Build a discrepancy between two decimal values
pub fn decimal_discrepancy(
    field: Field,
    internal: &BigDecimal,
    custodian: &BigDecimal,
    currency: Option<String>,
) -> FieldDiscrepancy {
    let delta = internal - custodian;
    FieldDiscrepancy {
        dimension: field.dimension(),
        field,
        internal_value: FieldValue::Decimal(internal.clone()),
        custodian_value: FieldValue::Decimal(custodian.clone()),
        absolute_delta: delta.abs(),
        delta,
        relative_delta_pct: relative_delta_pct(internal, custodian),
        currency,
        currency_mismatch: false,
        counterpart_currency: None,
    }
}
