//! Traits for comparison and loading extensibility

use async_trait::async_trait;

use crate::comparison::ComparisonContext;
use crate::records::RawRecord;
use crate::types::*;

/// A comparator for one field of a matched pair
///
/// Comparators are stateless per invocation and never see each other's output.
/// Implementations return at most one discrepancy; `Ok(None)` means the two
/// sides agree within tolerance. An `Err` is fatal and stops the whole run.
pub trait FieldComparator: Send + Sync {
    /// Field this comparator inspects
    fn field(&self) -> Field;

    /// Dimension the field belongs to
    fn dimension(&self) -> Dimension {
        self.field().dimension()
    }

    /// Compare one matched pair
    fn compare(
        &self,
        pair: &MatchedEventPair,
        ctx: &ComparisonContext,
    ) -> ReconciliationResult<Option<FieldDiscrepancy>>;
}

/// Loading collaborator supplying raw rows for one side
///
/// This allows the engine to be fed from CSV exports, a database, or memory
/// without doing any I/O itself. Loading must finish before a run starts.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load every raw row for the given side
    async fn load(&self, side: SourceSystem) -> ReconciliationResult<Vec<RawRecord>>;

    /// Short description used in logs
    fn describe(&self) -> String {
        "record source".to_string()
    }
}
