//! Share quantity comparison

use crate::comparison::{decimal_discrepancy, ComparisonContext};
use crate::traits::FieldComparator;
use crate::types::*;

/// Positions must reconcile exactly; any nonzero delta is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharesComparator;

impl FieldComparator for SharesComparator {
    fn field(&self) -> Field {
        Field::Quantity
    }

    fn compare(
        &self,
        pair: &MatchedEventPair,
        _ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>> {
        if pair.internal.quantity == pair.custodian.quantity {
            return Ok(None);
        }

        Ok(Some(decimal_discrepancy(
            Field::Quantity,
            &pair.internal.quantity,
            &pair.custodian.quantity,
            None,
        )))
    }
}
