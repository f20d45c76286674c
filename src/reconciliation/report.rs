//! Reconciliation report and aggregate statistics

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classification::compare_breaks;
use crate::types::*;

/// Where an event key ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    PerfectlyMatched,
    MatchedWithBreaks,
    UnmatchedInternal,
    UnmatchedCustodian,
    Duplicate,
}

/// Per-event summary line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub event_key: String,
    pub security_id: String,
    pub currency: String,
    pub status: EventStatus,
    pub break_count: usize,
    pub highest_severity: Option<Severity>,
}

/// Portfolio-level counts and totals
///
/// Impact totals are kept per currency; amounts in different currencies are
/// never added together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub internal_rows: usize,
    pub custodian_rows: usize,
    pub matched_events: usize,
    pub perfectly_matched: usize,
    pub matched_with_breaks: usize,
    pub unmatched_internal: usize,
    pub unmatched_custodian: usize,
    pub unparseable: usize,
    pub duplicate_events: usize,
    pub total_breaks: usize,
    pub breaks_by_severity: BTreeMap<Severity, usize>,
    pub breaks_by_category: BTreeMap<BreakCategory, usize>,
    pub absolute_impact_by_currency: BTreeMap<String, BigDecimal>,
    pub net_impact_by_currency: BTreeMap<String, BigDecimal>,
}

/// Breaks produced for one matched pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairBreaks {
    pub event_key: String,
    pub security_id: String,
    pub currency: String,
    pub breaks: Vec<Break>,
}

/// Result of one reconciliation run
///
/// Built fresh from an input snapshot; nothing is carried over from earlier
/// runs. Every event key appears in exactly one bucket, and rejected rows are
/// listed in `unparseable` so partial success is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub perfectly_matched: Vec<String>,
    pub matched_with_breaks: Vec<String>,
    pub unmatched_internal: Vec<DividendRecord>,
    pub unmatched_custodian: Vec<DividendRecord>,
    pub unparseable: Vec<MalformedRecordError>,
    pub duplicates: Vec<DuplicateEventKeyError>,
    /// Ranked by severity, then absolute impact, then event key
    pub breaks: Vec<Break>,
    /// One line per event key, sorted by key
    pub events: Vec<EventOutcome>,
    pub statistics: ReportStatistics,
}

/// Inputs collected by the engine before the report is assembled
#[derive(Debug, Clone, Default)]
pub struct ReportParts {
    pub internal_rows: usize,
    pub custodian_rows: usize,
    pub pairs: Vec<PairBreaks>,
    pub unmatched_internal: Vec<DividendRecord>,
    pub unmatched_custodian: Vec<DividendRecord>,
    pub unparseable: Vec<MalformedRecordError>,
    pub duplicates: Vec<DuplicateEventKeyError>,
    /// One break and summary per duplicated key
    pub duplicate_events: Vec<(Break, EventOutcome)>,
}

impl ReconciliationReport {
    /// Rank breaks, partition events and compute statistics
    pub fn assemble(mut parts: ReportParts) -> Self {
        parts
            .unmatched_internal
            .sort_by(|a, b| a.event_key.cmp(&b.event_key));
        parts
            .unmatched_custodian
            .sort_by(|a, b| a.event_key.cmp(&b.event_key));
        parts
            .duplicates
            .sort_by(|a, b| a.event_key.cmp(&b.event_key).then(a.side.cmp(&b.side)));

        let mut perfectly_matched = Vec::new();
        let mut matched_with_breaks = Vec::new();
        let mut events = Vec::new();
        let mut breaks = Vec::new();

        for pair in parts.pairs {
            let status = if pair.breaks.is_empty() {
                perfectly_matched.push(pair.event_key.clone());
                EventStatus::PerfectlyMatched
            } else {
                matched_with_breaks.push(pair.event_key.clone());
                EventStatus::MatchedWithBreaks
            };

            events.push(EventOutcome {
                event_key: pair.event_key,
                security_id: pair.security_id,
                currency: pair.currency,
                status,
                break_count: pair.breaks.len(),
                highest_severity: pair.breaks.iter().map(|b| b.severity).max(),
            });
            breaks.extend(pair.breaks);
        }

        for (status, records) in [
            (EventStatus::UnmatchedInternal, &parts.unmatched_internal),
            (EventStatus::UnmatchedCustodian, &parts.unmatched_custodian),
        ] {
            events.extend(records.iter().map(|record| EventOutcome {
                event_key: record.event_key.clone(),
                security_id: record.security_id.clone(),
                currency: record.currency.clone(),
                status,
                break_count: 0,
                highest_severity: None,
            }));
        }

        let duplicate_events = parts.duplicate_events.len();
        for (duplicate_break, outcome) in parts.duplicate_events {
            breaks.push(duplicate_break);
            events.push(outcome);
        }

        breaks.sort_by(compare_breaks);
        events.sort_by(|a, b| a.event_key.cmp(&b.event_key).then(a.status.cmp(&b.status)));
        perfectly_matched.sort();
        matched_with_breaks.sort();

        let mut statistics = ReportStatistics {
            internal_rows: parts.internal_rows,
            custodian_rows: parts.custodian_rows,
            matched_events: perfectly_matched.len() + matched_with_breaks.len(),
            perfectly_matched: perfectly_matched.len(),
            matched_with_breaks: matched_with_breaks.len(),
            unmatched_internal: parts.unmatched_internal.len(),
            unmatched_custodian: parts.unmatched_custodian.len(),
            unparseable: parts.unparseable.len(),
            duplicate_events,
            total_breaks: breaks.len(),
            ..ReportStatistics::default()
        };

        for item in &breaks {
            *statistics.breaks_by_severity.entry(item.severity).or_insert(0) += 1;
            *statistics.breaks_by_category.entry(item.category).or_insert(0) += 1;
            *statistics
                .absolute_impact_by_currency
                .entry(item.impact.currency.clone())
                .or_insert_with(|| BigDecimal::from(0)) += &item.impact.absolute;
            *statistics
                .net_impact_by_currency
                .entry(item.impact.currency.clone())
                .or_insert_with(|| BigDecimal::from(0)) += &item.impact.amount;
        }

        Self {
            perfectly_matched,
            matched_with_breaks,
            unmatched_internal: parts.unmatched_internal,
            unmatched_custodian: parts.unmatched_custodian,
            unparseable: parts.unparseable,
            duplicates: parts.duplicates,
            breaks,
            events,
            statistics,
        }
    }

    /// True when every input row was parsed and every event was matched exactly once
    pub fn is_complete(&self) -> bool {
        self.unparseable.is_empty()
            && self.duplicates.is_empty()
            && self.unmatched_internal.is_empty()
            && self.unmatched_custodian.is_empty()
    }

    /// Breaks for one event, in report order
    pub fn breaks_for(&self, event_key: &str) -> Vec<&Break> {
        self.breaks
            .iter()
            .filter(|b| b.event_key == event_key)
            .collect()
    }

    pub fn breaks_with_severity(&self, severity: Severity) -> Vec<&Break> {
        self.breaks
            .iter()
            .filter(|b| b.severity == severity)
            .collect()
    }

    pub fn breaks_in_category(&self, category: BreakCategory) -> Vec<&Break> {
        self.breaks
            .iter()
            .filter(|b| b.category == category)
            .collect()
    }

    pub fn event(&self, event_key: &str) -> Option<&EventOutcome> {
        self.events.iter().find(|e| e.event_key == event_key)
    }
}
