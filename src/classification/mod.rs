//! Break classification: severity, category and financial impact

pub mod impact;
pub mod rules;

pub use impact::*;
pub use rules::*;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::reconciliation::ReconciliationConfig;
use crate::types::*;

/// Turns one event's discrepancies into classified breaks
#[derive(Debug, Clone, Copy)]
pub struct BreakClassifier<'a> {
    config: &'a ReconciliationConfig,
}

impl<'a> BreakClassifier<'a> {
    pub fn new(config: &'a ReconciliationConfig) -> Self {
        Self { config }
    }

    /// One break per triggering dimension, in dimension order
    ///
    /// Discrepancies of the same dimension (net and gross, ex- and pay-date)
    /// share a break; different dimensions are never merged.
    pub fn classify(&self, pair: &MatchedEventPair, discrepancies: Vec<FieldDiscrepancy>) -> Vec<Break> {
        let mut by_dimension: BTreeMap<Dimension, Vec<FieldDiscrepancy>> = BTreeMap::new();
        for discrepancy in discrepancies {
            by_dimension
                .entry(discrepancy.dimension)
                .or_default()
                .push(discrepancy);
        }

        by_dimension
            .into_iter()
            .map(|(dimension, discrepancies)| self.build_break(pair, dimension, discrepancies))
            .collect()
    }

    fn build_break(
        &self,
        pair: &MatchedEventPair,
        dimension: Dimension,
        discrepancies: Vec<FieldDiscrepancy>,
    ) -> Break {
        let impact = estimate_impact(pair, dimension, &discrepancies);
        let candidate = BreakCandidate {
            pair,
            dimension,
            discrepancies: &discrepancies,
            impact: &impact,
            config: self.config,
        };
        let rule = first_matching_rule(&candidate);
        let category = categorize(&candidate);

        debug!(
            event_key = %pair.event_key,
            ?dimension,
            %category,
            severity = %rule.severity,
            rule = rule.name,
            "Classified break"
        );

        Break {
            event_key: pair.event_key.clone(),
            security_id: pair.security_id().to_string(),
            dimension: Some(dimension),
            category,
            severity: rule.severity,
            impact,
            discrepancies,
            rule: rule.name.to_string(),
        }
    }

    /// Break raised for an event key that cannot be reconciled because of duplicates
    pub fn duplicate_break(&self, event_key: &str, security_id: &str, currency: &str) -> Break {
        Break {
            event_key: event_key.to_string(),
            security_id: security_id.to_string(),
            dimension: None,
            category: BreakCategory::DuplicateRecord,
            severity: Severity::High,
            impact: FinancialImpact::zero(currency),
            discrepancies: Vec::new(),
            rule: "duplicate_event_key".to_string(),
        }
    }
}

/// Total order for report output
///
/// Severity descending, absolute impact descending, event key ascending;
/// dimension and category break the remaining ties so identical inputs
/// always produce the same sequence.
pub fn compare_breaks(a: &Break, b: &Break) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.impact.absolute.cmp(&a.impact.absolute))
        .then_with(|| a.event_key.cmp(&b.event_key))
        .then_with(|| a.dimension.cmp(&b.dimension))
        .then_with(|| a.category.cmp(&b.category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::fixtures::pair_with;
    use crate::comparison::{default_comparators, ComparisonContext};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn discrepancies(pair: &MatchedEventPair) -> Vec<FieldDiscrepancy> {
        let ctx = ComparisonContext::default();
        default_comparators()
            .iter()
            .filter_map(|c| c.compare(pair, &ctx).unwrap())
            .collect()
    }

    #[test]
    fn test_one_break_per_dimension() {
        let pair = pair_with(|c| {
            c.net_amount = BigDecimal::from(150_000);
            c.gross_amount = BigDecimal::from(200_000);
            c.ex_date = NaiveDate::from_ymd_opt(2024, 2, 8).unwrap();
            c.pay_date = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        });
        let config = ReconciliationConfig::default();
        let breaks = BreakClassifier::new(&config).classify(&pair, discrepancies(&pair));

        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks[0].dimension, Some(Dimension::Amount));
        assert_eq!(breaks[0].discrepancies.len(), 2);
        assert_eq!(breaks[0].category, BreakCategory::NetAmountMismatch);
        assert_eq!(breaks[0].impact.amount, BigDecimal::from(62_500));
        assert_eq!(breaks[0].severity, Severity::High);
        assert_eq!(breaks[1].dimension, Some(Dimension::Date));
        assert_eq!(breaks[1].discrepancies.len(), 2);
        assert_eq!(breaks[1].severity, Severity::Low);
    }

    #[test]
    fn test_currency_mismatch_is_critical() {
        let pair = pair_with(|c| c.currency = "KRW".to_string());
        let config = ReconciliationConfig::default();
        let breaks = BreakClassifier::new(&config).classify(&pair, discrepancies(&pair));

        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].category, BreakCategory::CurrencyMismatch);
        assert_eq!(breaks[0].severity, Severity::Critical);
        assert_eq!(breaks[0].rule, "currency_mismatch");
    }

    #[test]
    fn test_treaty_opportunity() {
        let pair = pair_with(|c| c.tax_rate = BigDecimal::from(25));
        let config = ReconciliationConfig::default();
        let breaks = BreakClassifier::new(&config).classify(&pair, discrepancies(&pair));

        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].category, BreakCategory::TreatyOpportunity);
        assert_eq!(breaks[0].severity, Severity::High);
        assert_eq!(breaks[0].impact.amount, BigDecimal::from(25_000));
    }

    #[test]
    fn test_compare_breaks_order() {
        let config = ReconciliationConfig::default();
        let classifier = BreakClassifier::new(&config);
        let mut low = classifier.duplicate_break("B", "X", "USD");
        low.severity = Severity::Low;
        let high_small = classifier.duplicate_break("A", "X", "USD");
        let mut high_large = classifier.duplicate_break("C", "X", "USD");
        high_large.impact = FinancialImpact::new(BigDecimal::from(-10), "USD");

        let mut breaks = vec![low, high_small, high_large];
        breaks.sort_by(compare_breaks);

        let keys: Vec<&str> = breaks.iter().map(|b| b.event_key.as_str()).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);
    }
}
