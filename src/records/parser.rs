//! Raw row validation into typed dividend records

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::traits::RecordSource;
use crate::types::*;
use crate::utils::validation::*;

/// An unvalidated row as supplied by a loading collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifier used when reporting the row back (file name and line, primary key, ...)
    pub row_id: String,
    /// Column name to raw cell text
    pub fields: HashMap<String, String>,
    /// Columns the loader could not decode, with the reason
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decode_errors: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            fields: HashMap::new(),
            decode_errors: Vec::new(),
        }
    }

    /// Builder-style setter
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Record a cell (or the whole row) the loader could not decode
    pub fn with_decode_error(mut self, column: impl Into<String>, reason: impl Into<String>) -> Self {
        self.decode_errors.push((column.into(), reason.into()));
        self
    }

    /// Cell text for a column; blank cells count as missing
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Source column name for every record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub event_key: String,
    pub security_id: String,
    pub organisation_name: Option<String>,
    pub quantity: String,
    pub currency: String,
    pub gross_amount: String,
    pub net_amount: String,
    pub tax_rate: String,
    pub fx_rate: String,
    pub ex_date: String,
    pub pay_date: String,
    pub lending_percentage: Option<String>,
}

impl ColumnMapping {
    /// Layout of the internal dividend bookings export
    pub fn nbim() -> Self {
        Self {
            event_key: "COAC_EVENT_KEY".to_string(),
            security_id: "ISIN".to_string(),
            organisation_name: Some("ORGANISATION_NAME".to_string()),
            quantity: "NOMINAL_BASIS".to_string(),
            currency: "QUOTATION_CURRENCY".to_string(),
            gross_amount: "GROSS_AMOUNT_QUOTATION".to_string(),
            net_amount: "NET_AMOUNT_QUOTATION".to_string(),
            tax_rate: "WTHTAX_RATE".to_string(),
            fx_rate: "AVG_FX_RATE_QUOTATION_TO_PORTFOLIO".to_string(),
            ex_date: "EXDATE".to_string(),
            pay_date: "PAYMENT_DATE".to_string(),
            lending_percentage: None,
        }
    }

    /// Layout of the custodian dividend bookings export
    pub fn custody() -> Self {
        Self {
            event_key: "COAC_EVENT_KEY".to_string(),
            security_id: "ISIN".to_string(),
            organisation_name: None,
            quantity: "NOMINAL_BASIS".to_string(),
            currency: "CURRENCIES".to_string(),
            gross_amount: "GROSS_AMOUNT".to_string(),
            net_amount: "NET_AMOUNT_QC".to_string(),
            tax_rate: "TAX_RATE".to_string(),
            fx_rate: "FX_RATE".to_string(),
            ex_date: "EX_DATE".to_string(),
            pay_date: "PAY_DATE".to_string(),
            lending_percentage: Some("LENDING_PERCENTAGE".to_string()),
        }
    }

    /// Default layout for a side
    pub fn for_side(side: SourceSystem) -> Self {
        match side {
            SourceSystem::Internal => Self::nbim(),
            SourceSystem::Custodian => Self::custody(),
        }
    }
}

/// One side's parsed records plus the rows that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub side: SourceSystem,
    pub records: Vec<DividendRecord>,
    pub rejected: Vec<MalformedRecordError>,
}

impl RecordBatch {
    /// Batch of already-validated records
    pub fn from_records(side: SourceSystem, records: Vec<DividendRecord>) -> Self {
        Self {
            side,
            records,
            rejected: Vec::new(),
        }
    }

    /// Total rows seen, valid or not
    pub fn row_count(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

/// Validates raw rows of one side into [`DividendRecord`]s
#[derive(Debug, Clone)]
pub struct RecordParser {
    side: SourceSystem,
    mapping: ColumnMapping,
}

impl RecordParser {
    /// Create a parser with an explicit column mapping
    pub fn new(side: SourceSystem, mapping: ColumnMapping) -> Self {
        Self { side, mapping }
    }

    /// Create a parser using the side's default booking-file layout
    pub fn for_side(side: SourceSystem) -> Self {
        Self::new(side, ColumnMapping::for_side(side))
    }

    pub fn side(&self) -> SourceSystem {
        self.side
    }

    /// Parse one row; the first invalid field is reported
    pub fn parse(&self, raw: &RawRecord) -> Result<DividendRecord, MalformedRecordError> {
        let row_id = raw.row_id.as_str();
        let m = &self.mapping;

        if let Some((column, reason)) = raw.decode_errors.first() {
            return Err(MalformedRecordError::new(row_id, column, reason));
        }

        let event_key = validate_event_key(row_id, &m.event_key, required(raw, &m.event_key)?)?;
        let security_id = required(raw, &m.security_id)?.to_string();
        let organisation_name = m
            .organisation_name
            .as_deref()
            .and_then(|column| raw.get(column))
            .map(str::to_string);

        let quantity = validate_non_negative(
            row_id,
            &m.quantity,
            parse_decimal(row_id, &m.quantity, required(raw, &m.quantity)?)?,
        )?;
        let currency = validate_currency_code(row_id, &m.currency, required(raw, &m.currency)?)?;
        let gross_amount = parse_decimal(row_id, &m.gross_amount, required(raw, &m.gross_amount)?)?;
        let net_amount = parse_decimal(row_id, &m.net_amount, required(raw, &m.net_amount)?)?;
        let tax_rate = validate_non_negative(
            row_id,
            &m.tax_rate,
            parse_rate(row_id, &m.tax_rate, required(raw, &m.tax_rate)?)?,
        )?;
        let fx_rate = validate_positive(
            row_id,
            &m.fx_rate,
            parse_decimal(row_id, &m.fx_rate, required(raw, &m.fx_rate)?)?,
        )?;
        let ex_date = parse_date(row_id, &m.ex_date, required(raw, &m.ex_date)?)?;
        let pay_date = parse_date(row_id, &m.pay_date, required(raw, &m.pay_date)?)?;

        let lending_percentage = match m.lending_percentage.as_deref() {
            Some(column) => match raw.get(column) {
                Some(value) => Some(validate_non_negative(
                    row_id,
                    column,
                    parse_rate(row_id, column, value)?,
                )?),
                None => None,
            },
            None => None,
        };

        Ok(DividendRecord {
            event_key,
            security_id,
            organisation_name,
            quantity,
            currency,
            gross_amount,
            net_amount,
            tax_rate,
            fx_rate,
            ex_date,
            pay_date,
            lending_percentage,
            source: self.side,
            row_id: row_id.to_string(),
        })
    }

    /// Parse every row; invalid rows land in `rejected`, never dropped
    pub fn parse_all(&self, rows: &[RawRecord]) -> RecordBatch {
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for raw in rows {
            match self.parse(raw) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(side = %self.side, row_id = %err.row_id, field = %err.field, "Rejected row: {}", err.reason);
                    rejected.push(err);
                }
            }
        }

        debug!(
            side = %self.side,
            parsed = records.len(),
            rejected = rejected.len(),
            "Parsed raw rows"
        );

        RecordBatch {
            side: self.side,
            records,
            rejected,
        }
    }

    /// Load this parser's side from a source and parse it
    pub async fn load(&self, source: &dyn RecordSource) -> ReconciliationResult<RecordBatch> {
        let rows = source.load(self.side).await?;
        debug!(side = %self.side, source = %source.describe(), rows = rows.len(), "Loaded raw rows");
        Ok(self.parse_all(&rows))
    }
}

/// Load and parse one side with an explicit column mapping
pub async fn load_batch(
    source: &dyn RecordSource,
    side: SourceSystem,
    mapping: ColumnMapping,
) -> ReconciliationResult<RecordBatch> {
    RecordParser::new(side, mapping).load(source).await
}

fn required<'a>(raw: &'a RawRecord, column: &str) -> Result<&'a str, MalformedRecordError> {
    raw.get(column)
        .ok_or_else(|| MalformedRecordError::new(&raw.row_id, column, "is missing"))
}
