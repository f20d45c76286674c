//! Reconciliation engine orchestrating matching, comparison and classification

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::classification::BreakClassifier;
use crate::comparison::{default_comparators, ComparisonContext};
use crate::reconciliation::{
    EventOutcome, EventStatus, PairBreaks, ReconciliationConfig, ReconciliationReport, ReportParts,
};
use crate::records::{match_records, RecordBatch};
use crate::traits::FieldComparator;
use crate::types::*;

/// Stateless reconciliation engine
///
/// The engine holds only its comparator set. Every call to [`run`](Self::run)
/// is a pure function of the two input batches and the configuration.
pub struct ReconciliationEngine {
    comparators: Vec<Box<dyn FieldComparator>>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    /// Engine with the standard comparator for every field
    pub fn new() -> Self {
        Self {
            comparators: default_comparators(),
        }
    }

    /// Engine with a custom comparator set
    pub fn with_comparators(comparators: Vec<Box<dyn FieldComparator>>) -> Self {
        Self { comparators }
    }

    pub fn comparators(&self) -> &[Box<dyn FieldComparator>] {
        &self.comparators
    }

    /// Reconcile an internal batch against a custodian batch
    ///
    /// An invalid configuration fails before any matching. Malformed and
    /// duplicate records only move their own event into an error bucket. A
    /// comparator error stops the remaining parallel work and is returned.
    pub fn run(
        &self,
        internal: &RecordBatch,
        custodian: &RecordBatch,
        config: &ReconciliationConfig,
    ) -> ReconciliationResult<ReconciliationReport> {
        config.validate()?;

        info!(
            internal_rows = internal.row_count(),
            custodian_rows = custodian.row_count(),
            "Starting reconciliation run"
        );

        let mut unparseable: Vec<MalformedRecordError> = internal
            .rejected
            .iter()
            .chain(custodian.rejected.iter())
            .cloned()
            .collect();
        let internal_records = records_for_side(internal, SourceSystem::Internal, &mut unparseable);
        let custodian_records = records_for_side(custodian, SourceSystem::Custodian, &mut unparseable);

        let outcome = match_records(&internal_records, &custodian_records)?;

        let ctx = ComparisonContext::from_config(config);
        let classifier = BreakClassifier::new(config);
        let pool = build_pool(config.max_workers)?;

        let pairs: Vec<PairBreaks> = pool.install(|| {
            outcome
                .pairs
                .par_iter()
                .map(|pair| self.reconcile_pair(pair, &ctx, &classifier))
                .collect::<ReconciliationResult<Vec<_>>>()
        })?;

        let duplicate_events = collect_duplicate_events(
            &outcome.duplicates,
            &internal_records,
            &custodian_records,
            &classifier,
        );

        let report = ReconciliationReport::assemble(ReportParts {
            internal_rows: internal.row_count(),
            custodian_rows: custodian.row_count(),
            pairs,
            unmatched_internal: outcome.unmatched_internal,
            unmatched_custodian: outcome.unmatched_custodian,
            unparseable,
            duplicates: outcome.duplicates,
            duplicate_events,
        });

        info!(
            matched = report.statistics.matched_events,
            perfectly_matched = report.statistics.perfectly_matched,
            breaks = report.statistics.total_breaks,
            unparseable = report.statistics.unparseable,
            duplicates = report.statistics.duplicate_events,
            "Reconciliation run finished"
        );

        Ok(report)
    }

    /// Compare and classify one pair
    fn reconcile_pair(
        &self,
        pair: &MatchedEventPair,
        ctx: &ComparisonContext,
        classifier: &BreakClassifier<'_>,
    ) -> ReconciliationResult<PairBreaks> {
        let mut discrepancies = Vec::new();
        for comparator in &self.comparators {
            if let Some(discrepancy) = comparator.compare(pair, ctx)? {
                discrepancies.push(discrepancy);
            }
        }

        debug!(
            event_key = %pair.event_key,
            discrepancies = discrepancies.len(),
            "Compared event"
        );

        Ok(PairBreaks {
            event_key: pair.event_key.clone(),
            security_id: pair.security_id().to_string(),
            currency: pair.internal.currency.clone(),
            breaks: classifier.classify(pair, discrepancies),
        })
    }
}

/// Reconcile with the default comparator set
pub fn reconcile(
    internal: &RecordBatch,
    custodian: &RecordBatch,
    config: &ReconciliationConfig,
) -> ReconciliationResult<ReconciliationReport> {
    ReconciliationEngine::new().run(internal, custodian, config)
}

/// Records tagged with the wrong side are rejected rather than matched
fn records_for_side(
    batch: &RecordBatch,
    side: SourceSystem,
    unparseable: &mut Vec<MalformedRecordError>,
) -> Vec<DividendRecord> {
    let mut records = Vec::with_capacity(batch.records.len());
    for record in &batch.records {
        if record.source == side {
            records.push(record.clone());
        } else {
            warn!(row_id = %record.row_id, expected = %side, found = %record.source, "Record supplied on the wrong side");
            unparseable.push(MalformedRecordError::new(
                &record.row_id,
                "source",
                format!("expected a {} record, got {}", side, record.source),
            ));
        }
    }
    records
}

fn build_pool(max_workers: usize) -> ReconciliationResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .thread_name(|index| format!("recon-worker-{}", index))
        .build()
        .map_err(|err| ReconciliationError::WorkerPool(err.to_string()))
}

/// One duplicate break and event line per duplicated key
fn collect_duplicate_events(
    duplicates: &[DuplicateEventKeyError],
    internal: &[DividendRecord],
    custodian: &[DividendRecord],
    classifier: &BreakClassifier<'_>,
) -> Vec<(Break, EventOutcome)> {
    let mut by_key: BTreeMap<&str, &DividendRecord> = BTreeMap::new();
    for duplicate in duplicates {
        let key = duplicate.event_key.as_str();
        if by_key.contains_key(key) {
            continue;
        }
        if let Some(record) = internal
            .iter()
            .chain(custodian.iter())
            .find(|r| r.event_key == key)
        {
            by_key.insert(key, record);
        }
    }

    by_key
        .into_iter()
        .map(|(key, record)| {
            let duplicate_break =
                classifier.duplicate_break(key, &record.security_id, &record.currency);
            let outcome = EventOutcome {
                event_key: key.to_string(),
                security_id: record.security_id.clone(),
                currency: record.currency.clone(),
                status: EventStatus::Duplicate,
                break_count: 1,
                highest_severity: Some(duplicate_break.severity),
            };
            (duplicate_break, outcome)
        })
        .collect()
}
