//! Gross and net amount comparison in native settlement currency

use crate::comparison::{decimal_discrepancy, exceeds_relative_tolerance, ComparisonContext};
use crate::traits::FieldComparator;
use crate::types::*;

/// Compares one monetary field of a pair
///
/// When the two sides settle in different currencies no numeric comparison is
/// possible; the comparator always reports a discrepancy flagged as a currency
/// mismatch, whatever the amounts are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountComparator {
    field: Field,
}

impl AmountComparator {
    pub fn net() -> Self {
        Self {
            field: Field::NetAmount,
        }
    }

    pub fn gross() -> Self {
        Self {
            field: Field::GrossAmount,
        }
    }
}

impl FieldComparator for AmountComparator {
    fn field(&self) -> Field {
        self.field
    }

    fn compare(
        &self,
        pair: &MatchedEventPair,
        ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>> {
        let (internal, custodian) = match self.field {
            Field::GrossAmount => (&pair.internal.gross_amount, &pair.custodian.gross_amount),
            _ => (&pair.internal.net_amount, &pair.custodian.net_amount),
        };
        let currency = Some(pair.internal.currency.clone());

        if !pair.currencies_match() {
            let mut discrepancy = decimal_discrepancy(self.field, internal, custodian, currency);
            discrepancy.currency_mismatch = true;
            discrepancy.counterpart_currency = Some(pair.custodian.currency.clone());
            return Ok(Some(discrepancy));
        }

        if !exceeds_relative_tolerance(internal, custodian, &ctx.amount_relative_tolerance_pct) {
            return Ok(None);
        }

        Ok(Some(decimal_discrepancy(
            self.field, internal, custodian, currency,
        )))
    }
}
