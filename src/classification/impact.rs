//! Financial impact estimation in the event's settlement currency

use bigdecimal::BigDecimal;

use crate::types::*;

/// Decimal places kept on projected (non-monetary) impacts
const PROJECTED_IMPACT_SCALE: i64 = 2;

/// Estimate the cash effect of one dimension's discrepancies
///
/// Monetary discrepancies use their signed delta directly. Other dimensions
/// are projected onto the internal gross dividend so every break can be
/// ranked on the same scale. The sign is positive when the internal ledger
/// expects more cash than the custodian reports. A currency mismatch has no
/// meaningful delta, so the whole internal net amount is reported as exposure.
pub fn estimate_impact(
    pair: &MatchedEventPair,
    dimension: Dimension,
    discrepancies: &[FieldDiscrepancy],
) -> FinancialImpact {
    let internal = &pair.internal;
    let currency = internal.currency.clone();

    if discrepancies.iter().any(|d| d.currency_mismatch) {
        return FinancialImpact::new(internal.net_amount.clone(), currency);
    }

    let amount = match dimension {
        Dimension::Amount => discrepancies
            .iter()
            .find(|d| d.field == Field::NetAmount)
            .or_else(|| discrepancies.first())
            .map(|d| d.delta.clone()),
        Dimension::Shares => project_shares(pair),
        Dimension::TaxRate => Some(project_tax_rate(pair)),
        Dimension::FxRate => project_fx_rate(pair),
        Dimension::Date => None,
    };

    match amount {
        Some(amount) => FinancialImpact::new(amount, currency),
        None => FinancialImpact::zero(currency),
    }
}

/// Share delta times gross dividend per share
fn project_shares(pair: &MatchedEventPair) -> Option<BigDecimal> {
    let per_share = pair
        .internal
        .gross_per_share()
        .or_else(|| pair.custodian.gross_per_share())?;
    let delta = &pair.internal.quantity - &pair.custodian.quantity;
    Some((delta * per_share).round(PROJECTED_IMPACT_SCALE))
}

/// Extra withholding (in points) applied to the gross amount
fn project_tax_rate(pair: &MatchedEventPair) -> BigDecimal {
    let delta_pp = &pair.custodian.tax_rate - &pair.internal.tax_rate;
    (delta_pp * &pair.internal.gross_amount / BigDecimal::from(100)).round(PROJECTED_IMPACT_SCALE)
}

/// Relative FX difference applied to the gross amount
fn project_fx_rate(pair: &MatchedEventPair) -> Option<BigDecimal> {
    let internal_fx = &pair.internal.fx_rate;
    if *internal_fx == BigDecimal::from(0) {
        return None;
    }
    let delta = internal_fx - &pair.custodian.fx_rate;
    Some((delta * &pair.internal.gross_amount / internal_fx).round(PROJECTED_IMPACT_SCALE))
}
