//! # Dividend Recon
//!
//! Break detection and classification engine for reconciling dividend
//! payments between an internal ledger and the records reported by global
//! custodians.
//!
//! ## Features
//!
//! - **Record model**: validated, exact-decimal dividend records; rejected rows are reported, never dropped
//! - **Matching**: exact event-key pairing with orphan and duplicate detection
//! - **Field comparators**: amounts, shares, withholding tax, FX rate and dates, each in native currency
//! - **Classification**: ordered severity rules, category tags and impact estimates
//! - **Reconciliation engine**: parallel per-event pipeline producing a deterministically ranked report
//! - **Loading abstraction**: trait-based record sources (in-memory, CSV booking files)
//!
//! ## Quick Start
//!
//! ```rust
//! use dividend_recon::{reconcile, RecordBatch, ReconciliationConfig, SourceSystem};
//!
//! // Batches usually come from `RecordParser::parse_all` or `RecordParser::load`
//! let internal = RecordBatch::from_records(SourceSystem::Internal, Vec::new());
//! let custodian = RecordBatch::from_records(SourceSystem::Custodian, Vec::new());
//!
//! let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();
//! assert!(report.breaks.is_empty());
//! ```

pub mod classification;
pub mod comparison;
pub mod reconciliation;
pub mod records;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use classification::{compare_breaks, BreakClassifier, SEVERITY_RULES};
pub use comparison::{default_comparators, ComparisonContext};
pub use reconciliation::*;
pub use records::*;
pub use traits::*;
pub use types::*;
