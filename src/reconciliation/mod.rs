//! Reconciliation engine: configuration, orchestration and reporting
//!
//! A run validates its [`ReconciliationConfig`], pairs the two record batches,
//! runs every comparator over each pair on a bounded worker pool, classifies
//! the discrepancies and assembles a ranked [`ReconciliationReport`].

pub mod config;
pub mod engine;
pub mod report;

pub use config::*;
pub use engine::*;
pub use report::*;
