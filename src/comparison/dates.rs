//! Ex-date and pay-date comparison

use bigdecimal::BigDecimal;

use crate::comparison::ComparisonContext;
use crate::traits::FieldComparator;
use crate::types::*;

/// Compares one date field; any difference is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateComparator {
    field: Field,
}

impl DateComparator {
    pub fn ex_date() -> Self {
        Self {
            field: Field::ExDate,
        }
    }

    pub fn pay_date() -> Self {
        Self {
            field: Field::PayDate,
        }
    }
}

impl FieldComparator for DateComparator {
    fn field(&self) -> Field {
        self.field
    }

    fn compare(
        &self,
        pair: &MatchedEventPair,
        _ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>> {
        let (internal, custodian) = match self.field {
            Field::ExDate => (pair.internal.ex_date, pair.custodian.ex_date),
            _ => (pair.internal.pay_date, pair.custodian.pay_date),
        };

        if internal == custodian {
            return Ok(None);
        }

        let delta = BigDecimal::from(internal.signed_duration_since(custodian).num_days());
        Ok(Some(FieldDiscrepancy {
            dimension: Dimension::Date,
            field: self.field,
            internal_value: FieldValue::Date(internal),
            custodian_value: FieldValue::Date(custodian),
            absolute_delta: delta.abs(),
            delta,
            relative_delta_pct: None,
            currency: None,
            currency_mismatch: false,
            counterpart_currency: None,
        }))
    }
}
