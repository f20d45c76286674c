//! Exact event-key matching between internal and custodian records

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use crate::types::*;

/// Result of pairing two record sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// One pair per key present exactly once on each side
    pub pairs: Vec<MatchedEventPair>,
    /// Records with no custodian counterpart
    pub unmatched_internal: Vec<DividendRecord>,
    /// Records with no internal counterpart
    pub unmatched_custodian: Vec<DividendRecord>,
    /// Keys seen more than once on a side; none of their records are paired
    pub duplicates: Vec<DuplicateEventKeyError>,
}

impl MatchOutcome {
    /// Event keys that ended up in the duplicate bucket
    pub fn duplicate_keys(&self) -> BTreeSet<&str> {
        self.duplicates
            .iter()
            .map(|dup| dup.event_key.as_str())
            .collect()
    }
}

/// Pair records by exact event key
///
/// Keys are grouped per side in a hash map, so matching is linear in the
/// number of records. Outputs follow the first appearance of each key,
/// internal records first, so the same input always yields the same outcome.
/// A key that appears more than once on either side is withheld from both
/// pairing and the orphan lists.
pub fn match_records(
    internal: &[DividendRecord],
    custodian: &[DividendRecord],
) -> ReconciliationResult<MatchOutcome> {
    let internal_by_key = group_by_key(internal);
    let custodian_by_key = group_by_key(custodian);

    let mut outcome = MatchOutcome::default();

    let mut seen: HashSet<&str> = HashSet::with_capacity(internal_by_key.len());
    let keys = internal
        .iter()
        .chain(custodian.iter())
        .map(|record| record.event_key.as_str())
        .filter(|key| seen.insert(*key));

    for key in keys {
        let internal_records = internal_by_key.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let custodian_records = custodian_by_key.get(key).map(Vec::as_slice).unwrap_or(&[]);

        if internal_records.len() > 1 || custodian_records.len() > 1 {
            for (side, records) in [
                (SourceSystem::Internal, internal_records),
                (SourceSystem::Custodian, custodian_records),
            ] {
                if records.len() > 1 {
                    warn!(event_key = key, %side, count = records.len(), "Duplicate event key");
                    outcome.duplicates.push(DuplicateEventKeyError {
                        event_key: key.to_string(),
                        side,
                        count: records.len(),
                        row_ids: records.iter().map(|r| r.row_id.clone()).collect(),
                    });
                }
            }
            continue;
        }

        match (internal_records.first(), custodian_records.first()) {
            (Some(nbim), Some(custody)) => {
                debug!(event_key = key, "Matched event");
                outcome
                    .pairs
                    .push(MatchedEventPair::new((*nbim).clone(), (*custody).clone())?);
            }
            (Some(nbim), None) => {
                warn!(event_key = key, "No custodian record for event");
                outcome.unmatched_internal.push((*nbim).clone());
            }
            (None, Some(custody)) => {
                warn!(event_key = key, "No internal record for event");
                outcome.unmatched_custodian.push((*custody).clone());
            }
            (None, None) => {}
        }
    }

    Ok(outcome)
}

fn group_by_key(records: &[DividendRecord]) -> HashMap<&str, Vec<&DividendRecord>> {
    let mut grouped: HashMap<&str, Vec<&DividendRecord>> = HashMap::with_capacity(records.len());
    for record in records {
        grouped
            .entry(record.event_key.as_str())
            .or_default()
            .push(record);
    }
    grouped
}
