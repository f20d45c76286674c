//! In-memory record source for testing and embedding

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::records::RawRecord;
use crate::traits::*;
use crate::types::*;

/// In-memory record source holding raw rows per side
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    rows: Arc<RwLock<HashMap<SourceSystem, Vec<RawRecord>>>>,
}

impl MemoryRecordSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-filled for both sides
    pub fn with_rows(internal: Vec<RawRecord>, custodian: Vec<RawRecord>) -> Self {
        let mut rows = HashMap::new();
        rows.insert(SourceSystem::Internal, internal);
        rows.insert(SourceSystem::Custodian, custodian);
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Append one row to a side
    pub fn push(&self, side: SourceSystem, row: RawRecord) -> ReconciliationResult<()> {
        self.rows
            .write()
            .map_err(|_| ReconciliationError::Source("memory source lock poisoned".to_string()))?
            .entry(side)
            .or_default()
            .push(row);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconciliationResult<()> {
        self.rows
            .write()
            .map_err(|_| ReconciliationError::Source("memory source lock poisoned".to_string()))?
            .clear();
        Ok(())
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn load(&self, side: SourceSystem) -> ReconciliationResult<Vec<RawRecord>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| ReconciliationError::Source("memory source lock poisoned".to_string()))?;
        Ok(rows.get(&side).cloned().unwrap_or_default())
    }

    fn describe(&self) -> String {
        "in-memory rows".to_string()
    }
}
