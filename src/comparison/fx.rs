//! FX rate comparison

use crate::comparison::{decimal_discrepancy, exceeds_relative_tolerance, ComparisonContext};
use crate::traits::FieldComparator;
use crate::types::*;

/// Flags FX rates whose relative difference exceeds the configured tolerance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FxRateComparator;

impl FieldComparator for FxRateComparator {
    fn field(&self) -> Field {
        Field::FxRate
    }

    fn compare(
        &self,
        pair: &MatchedEventPair,
        ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>> {
        let internal = &pair.internal.fx_rate;
        let custodian = &pair.custodian.fx_rate;

        if !exceeds_relative_tolerance(internal, custodian, &ctx.fx_tolerance_pct) {
            return Ok(None);
        }

        Ok(Some(decimal_discrepancy(Field::FxRate, internal, custodian, None)))
    }
}
