//! Core types and data structures for dividend reconciliation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the reconciliation a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// The asset owner's internal ledger (NBIM bookings)
    Internal,
    /// Records reported by a global custodian
    Custodian,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::Internal => "internal",
            SourceSystem::Custodian => "custodian",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side's view of a single dividend event
///
/// Records are produced by [`crate::records::RecordParser`] and never mutated
/// afterwards; the engine only ever reads them through shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    /// Identifier pairing an internal record with its custodian counterpart
    pub event_key: String,
    /// Security identifier (ISIN or similar)
    pub security_id: String,
    /// Issuer name, when the source carries it
    pub organisation_name: Option<String>,
    /// Number of shares held on the ex-date
    pub quantity: BigDecimal,
    /// Settlement (quotation) currency, ISO 4217
    pub currency: String,
    /// Gross dividend in settlement currency
    pub gross_amount: BigDecimal,
    /// Net dividend after withholding tax, in settlement currency
    pub net_amount: BigDecimal,
    /// Withholding tax rate in percent (15 means 15%)
    pub tax_rate: BigDecimal,
    /// FX rate used to derive portfolio-currency figures
    pub fx_rate: BigDecimal,
    pub ex_date: NaiveDate,
    pub pay_date: NaiveDate,
    /// Percentage of the position out on securities loan over the ex-date
    pub lending_percentage: Option<BigDecimal>,
    /// Source system tag
    pub source: SourceSystem,
    /// Row identifier assigned by the loading collaborator
    pub row_id: String,
}

impl DividendRecord {
    /// Gross dividend per share, or `None` for a zero position
    pub fn gross_per_share(&self) -> Option<BigDecimal> {
        if self.quantity == BigDecimal::from(0) {
            None
        } else {
            Some(&self.gross_amount / &self.quantity)
        }
    }

    /// Whether part of the position was on loan over the ex-date
    pub fn is_on_loan(&self) -> bool {
        self.lending_percentage
            .as_ref()
            .is_some_and(|pct| *pct > BigDecimal::from(0))
    }
}

/// An internal record and a custodian record sharing one event key
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEventPair {
    pub event_key: String,
    pub internal: DividendRecord,
    pub custodian: DividendRecord,
}

impl MatchedEventPair {
    /// Pair two records, checking sides and keys line up
    pub fn new(internal: DividendRecord, custodian: DividendRecord) -> ReconciliationResult<Self> {
        if internal.source != SourceSystem::Internal || custodian.source != SourceSystem::Custodian {
            return Err(ReconciliationError::InvalidPair(format!(
                "expected internal/custodian records, got {}/{}",
                internal.source, custodian.source
            )));
        }

        if internal.event_key != custodian.event_key {
            return Err(ReconciliationError::InvalidPair(format!(
                "event keys differ: {} != {}",
                internal.event_key, custodian.event_key
            )));
        }

        Ok(Self {
            event_key: internal.event_key.clone(),
            internal,
            custodian,
        })
    }

    /// Currency codes are compared verbatim, never normalised
    pub fn currencies_match(&self) -> bool {
        self.internal.currency == self.custodian.currency
    }

    pub fn security_id(&self) -> &str {
        &self.internal.security_id
    }
}

/// Financial dimension a discrepancy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Amount,
    TaxRate,
    Shares,
    FxRate,
    Date,
}

impl Dimension {
    /// Amount is the only dimension denominated in money
    pub fn is_monetary(&self) -> bool {
        matches!(self, Dimension::Amount)
    }
}

/// Concrete record field compared by a comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NetAmount,
    GrossAmount,
    Quantity,
    TaxRate,
    FxRate,
    ExDate,
    PayDate,
}

impl Field {
    pub fn dimension(&self) -> Dimension {
        match self {
            Field::NetAmount | Field::GrossAmount => Dimension::Amount,
            Field::Quantity => Dimension::Shares,
            Field::TaxRate => Dimension::TaxRate,
            Field::FxRate => Dimension::FxRate,
            Field::ExDate | Field::PayDate => Dimension::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NetAmount => "net_amount",
            Field::GrossAmount => "gross_amount",
            Field::Quantity => "quantity",
            Field::TaxRate => "tax_rate",
            Field::FxRate => "fx_rate",
            Field::ExDate => "ex_date",
            Field::PayDate => "pay_date",
        }
    }
}

/// Value observed on one side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Decimal(BigDecimal),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            FieldValue::Decimal(value) => Some(value),
            FieldValue::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            FieldValue::Decimal(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Decimal(value) => write!(f, "{}", value),
            FieldValue::Date(date) => write!(f, "{}", date),
        }
    }
}

/// A measured disagreement on one field of a matched pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiscrepancy {
    pub dimension: Dimension,
    pub field: Field,
    pub internal_value: FieldValue,
    pub custodian_value: FieldValue,
    /// Internal minus custodian (days for date fields)
    pub delta: BigDecimal,
    pub absolute_delta: BigDecimal,
    /// Relative delta in percent of the internal value; `None` when that base is zero
    pub relative_delta_pct: Option<BigDecimal>,
    /// Internal settlement currency, for monetary dimensions
    pub currency: Option<String>,
    /// Set when the two sides settle in different currencies
    pub currency_mismatch: bool,
    /// Custodian currency, only recorded on a currency mismatch
    pub counterpart_currency: Option<String>,
}

/// Break severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable classification of a break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakCategory {
    CurrencyMismatch,
    NetAmountMismatch,
    GrossAmountMismatch,
    /// Custodian withheld at a different rate; usually an unclaimed treaty benefit
    TreatyOpportunity,
    /// Higher withholding explained by shares being on loan over the ex-date
    LendingTaxLeakage,
    PositionMismatch,
    FxPricingIssue,
    SettlementDelay,
    DateMismatch,
    DuplicateRecord,
}

impl BreakCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BreakCategory::CurrencyMismatch => "currency mismatch",
            BreakCategory::NetAmountMismatch => "net amount mismatch",
            BreakCategory::GrossAmountMismatch => "gross amount mismatch",
            BreakCategory::TreatyOpportunity => "tax treaty opportunity",
            BreakCategory::LendingTaxLeakage => "securities lending tax leakage",
            BreakCategory::PositionMismatch => "position mismatch",
            BreakCategory::FxPricingIssue => "FX pricing issue",
            BreakCategory::SettlementDelay => "settlement delay",
            BreakCategory::DateMismatch => "date mismatch",
            BreakCategory::DuplicateRecord => "duplicate record",
        }
    }
}

impl fmt::Display for BreakCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Estimated cash effect of a break, in the event's settlement currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialImpact {
    /// Signed: positive when the internal ledger expects more than the custodian reports
    pub amount: BigDecimal,
    /// Ranking key
    pub absolute: BigDecimal,
    pub currency: String,
}

impl FinancialImpact {
    pub fn new(amount: BigDecimal, currency: impl Into<String>) -> Self {
        Self {
            absolute: amount.abs(),
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(BigDecimal::from(0), currency)
    }
}

/// A classified discrepancy for one event and one dimension
///
/// Breaks are immutable; a correction is a new reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub event_key: String,
    pub security_id: String,
    /// `None` for breaks that are not about a field (duplicate records)
    pub dimension: Option<Dimension>,
    pub category: BreakCategory,
    pub severity: Severity,
    pub impact: FinancialImpact,
    pub discrepancies: Vec<FieldDiscrepancy>,
    /// Name of the severity rule that fired
    pub rule: String,
}

/// A raw row that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Malformed record {row_id}: field '{field}' {reason}")]
pub struct MalformedRecordError {
    pub row_id: String,
    pub field: String,
    pub reason: String,
}

impl MalformedRecordError {
    pub fn new(row_id: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Several records on one side share an event key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Duplicate event key {event_key}: {count} {side} records")]
pub struct DuplicateEventKeyError {
    pub event_key: String,
    pub side: SourceSystem,
    pub count: usize,
    pub row_ids: Vec<String>,
}

/// An invalid tunable; fatal for the whole run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid configuration '{parameter}': {reason}")]
pub struct ConfigurationError {
    pub parameter: String,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a reconciliation run
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Comparison failed for event {event_key}: {reason}")]
    Comparison { event_key: String, reason: String },
    #[error("Invalid pair: {0}")]
    InvalidPair(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("Record source error: {0}")]
    Source(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reconciliation operations
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;
