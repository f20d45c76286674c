//! CSV record source for semicolon-separated dividend booking exports

use async_trait::async_trait;
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::records::RawRecord;
use crate::traits::*;
use crate::types::*;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reads one booking file per side
///
/// Files must have a header row. Each row becomes a [`RawRecord`] keyed by
/// header name, with a row id of `<file name>:<line>`.
///
/// Files are read with blocking `std::fs` calls on the polling thread, which
/// suits the one-shot load before a run. Callers on a shared async runtime
/// should wrap [`RecordSource::load`] in their runtime's blocking task.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    internal_path: PathBuf,
    custodian_path: PathBuf,
    delimiter: u8,
}

impl CsvRecordSource {
    /// Source over the internal and custodian export files, `;`-separated
    pub fn new(internal_path: impl Into<PathBuf>, custodian_path: impl Into<PathBuf>) -> Self {
        Self {
            internal_path: internal_path.into(),
            custodian_path: custodian_path.into(),
            delimiter: b';',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self, side: SourceSystem) -> &Path {
        match side {
            SourceSystem::Internal => &self.internal_path,
            SourceSystem::Custodian => &self.custodian_path,
        }
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    async fn load(&self, side: SourceSystem) -> ReconciliationResult<Vec<RawRecord>> {
        let path = self.path(side);
        let content = std::fs::read(path)?;
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| side.to_string());

        let rows = parse_csv(&content, self.delimiter, &label)?;
        debug!(%side, path = %path.display(), rows = rows.len(), "Loaded booking file");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!(
            "CSV files {} / {}",
            self.internal_path.display(),
            self.custodian_path.display()
        )
    }
}

/// Parse CSV bytes with a header row into raw records
///
/// Only an unreadable header fails the whole file. A row that cannot be read
/// or has a cell that is not valid UTF-8 is still returned, carrying a decode
/// error, so the parser reports it as unparseable.
pub fn parse_csv(content: &[u8], delimiter: u8, label: &str) -> ReconciliationResult<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches(BYTE_ORDER_MARK).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err
                    .position()
                    .map(|pos| pos.line())
                    .unwrap_or(rows.len() as u64 + 2);
                warn!(file = label, line, "Unreadable CSV row: {}", err);
                rows.push(
                    RawRecord::new(format!("{}:{}", label, line))
                        .with_decode_error("row", format!("could not be read: {}", err)),
                );
                continue;
            }
        };
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(rows.len() as u64 + 2);
        let mut raw = RawRecord::new(format!("{}:{}", label, line));
        for (header, value) in headers.iter().zip(record.iter()) {
            match std::str::from_utf8(value) {
                Ok(text) => {
                    raw.fields.insert(header.clone(), text.to_string());
                }
                Err(_) => {
                    warn!(row_id = %raw.row_id, column = %header, "Cell is not valid UTF-8");
                    raw = raw.with_decode_error(header.clone(), "is not valid UTF-8");
                }
            }
        }
        rows.push(raw);
    }

    Ok(rows)
}
