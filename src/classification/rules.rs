//! Ordered severity rules and category assignment
//!
//! The order of [`SEVERITY_RULES`] is the single source of truth for severity
//! precedence: rules are evaluated top to bottom and the first match wins.

use bigdecimal::BigDecimal;
use std::fmt;

use crate::reconciliation::ReconciliationConfig;
use crate::types::*;

/// Everything a rule may look at for one event and one dimension
#[derive(Debug, Clone, Copy)]
pub struct BreakCandidate<'a> {
    pub pair: &'a MatchedEventPair,
    pub dimension: Dimension,
    pub discrepancies: &'a [FieldDiscrepancy],
    pub impact: &'a FinancialImpact,
    pub config: &'a ReconciliationConfig,
}

impl BreakCandidate<'_> {
    pub fn currency_mismatch(&self) -> bool {
        self.discrepancies.iter().any(|d| d.currency_mismatch)
    }

    /// Any discrepancy at or above `threshold_pct`; a zero base counts as unbounded
    ///
    /// Evaluated on the exact ratio, never on the rounded `relative_delta_pct`.
    pub fn relative_delta_at_least(&self, threshold_pct: &BigDecimal) -> bool {
        self.discrepancies.iter().any(|d| match d.internal_value.as_decimal() {
            Some(internal) => {
                let base = internal.abs();
                if base == BigDecimal::from(0) {
                    d.absolute_delta > BigDecimal::from(0)
                } else {
                    &d.absolute_delta * BigDecimal::from(100) >= threshold_pct * &base
                }
            }
            None => false,
        })
    }

    /// Days the custodian paid after the internal pay date, when positive
    pub fn payment_delay_days(&self) -> Option<i64> {
        self.discrepancies
            .iter()
            .find(|d| d.field == Field::PayDate)
            .and_then(|d| {
                let internal = d.internal_value.as_date()?;
                let custodian = d.custodian_value.as_date()?;
                let days = custodian.signed_duration_since(internal).num_days();
                (days > 0).then_some(days)
            })
    }

    pub fn is_settlement_delay(&self) -> bool {
        self.payment_delay_days()
            .is_some_and(|days| days > self.config.settlement_delay_days)
    }

    /// Custodian withheld more while shares were out on loan
    pub fn is_lending_related(&self) -> bool {
        let internal = &self.pair.internal;
        let custodian = &self.pair.custodian;
        (internal.is_on_loan() || custodian.is_on_loan()) && custodian.tax_rate > internal.tax_rate
    }

    fn has_field(&self, field: Field) -> bool {
        self.discrepancies.iter().any(|d| d.field == field)
    }
}

/// One entry of the severity policy
#[derive(Clone, Copy)]
pub struct SeverityRule {
    pub name: &'static str,
    pub severity: Severity,
    applies: fn(&BreakCandidate<'_>) -> bool,
}

impl fmt::Debug for SeverityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeverityRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish()
    }
}

impl SeverityRule {
    pub fn applies(&self, candidate: &BreakCandidate<'_>) -> bool {
        (self.applies)(candidate)
    }
}

/// Severity policy in precedence order
pub static SEVERITY_RULES: [SeverityRule; 9] = [
    SeverityRule {
        name: "currency_mismatch",
        severity: Severity::Critical,
        applies: |c| c.currency_mismatch(),
    },
    SeverityRule {
        name: "high_impact",
        severity: Severity::Critical,
        applies: |c| c.impact.absolute >= c.config.high_impact_threshold,
    },
    SeverityRule {
        name: "large_relative_amount_delta",
        severity: Severity::High,
        applies: |c| {
            c.dimension == Dimension::Amount
                && c.relative_delta_at_least(&c.config.high_relative_delta_pct)
        },
    },
    SeverityRule {
        name: "tax_rate_delta",
        severity: Severity::High,
        applies: |c| c.dimension == Dimension::TaxRate,
    },
    SeverityRule {
        name: "share_quantity_delta",
        severity: Severity::High,
        applies: |c| c.dimension == Dimension::Shares,
    },
    SeverityRule {
        name: "fx_rate_delta",
        severity: Severity::Medium,
        applies: |c| c.dimension == Dimension::FxRate,
    },
    SeverityRule {
        name: "amount_delta",
        severity: Severity::Medium,
        applies: |c| c.dimension == Dimension::Amount,
    },
    SeverityRule {
        name: "settlement_delay",
        severity: Severity::Medium,
        applies: |c| c.dimension == Dimension::Date && c.is_settlement_delay(),
    },
    SeverityRule {
        name: "date_mismatch",
        severity: Severity::Low,
        applies: |c| c.dimension == Dimension::Date,
    },
];

/// Used only if no rule matches
pub static FALLBACK_RULE: SeverityRule = SeverityRule {
    name: "unclassified",
    severity: Severity::Info,
    applies: |_| true,
};

/// First rule that applies to the candidate
pub fn first_matching_rule(candidate: &BreakCandidate<'_>) -> &'static SeverityRule {
    SEVERITY_RULES
        .iter()
        .find(|rule| rule.applies(candidate))
        .unwrap_or(&FALLBACK_RULE)
}

/// Category tag for a candidate
pub fn categorize(candidate: &BreakCandidate<'_>) -> BreakCategory {
    if candidate.currency_mismatch() {
        return BreakCategory::CurrencyMismatch;
    }

    match candidate.dimension {
        Dimension::Amount => {
            if candidate.has_field(Field::NetAmount) {
                BreakCategory::NetAmountMismatch
            } else {
                BreakCategory::GrossAmountMismatch
            }
        }
        Dimension::TaxRate => {
            if candidate.is_lending_related() {
                BreakCategory::LendingTaxLeakage
            } else {
                BreakCategory::TreatyOpportunity
            }
        }
        Dimension::Shares => BreakCategory::PositionMismatch,
        Dimension::FxRate => BreakCategory::FxPricingIssue,
        Dimension::Date => {
            if candidate.is_settlement_delay() {
                BreakCategory::SettlementDelay
            } else {
                BreakCategory::DateMismatch
            }
        }
    }
}
