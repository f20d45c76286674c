//! Withholding tax rate comparison

use crate::comparison::{decimal_discrepancy, ComparisonContext};
use crate::traits::FieldComparator;
use crate::types::*;

/// Flags withholding rates that differ by more than the configured
/// number of percentage points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxRateComparator;

impl FieldComparator for TaxRateComparator {
    fn field(&self) -> Field {
        Field::TaxRate
    }

    fn compare(
        &self,
        pair: &MatchedEventPair,
        ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>> {
        let internal = &pair.internal.tax_rate;
        let custodian = &pair.custodian.tax_rate;

        if (internal - custodian).abs() <= ctx.tax_rate_threshold_pct {
            return Ok(None);
        }

        Ok(Some(decimal_discrepancy(
            Field::TaxRate,
            internal,
            custodian,
            None,
        )))
    }
}
