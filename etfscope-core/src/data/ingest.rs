//! CSV ingestion: raw text → header row + untyped records.
//!
//! Rows are mapped by header name. A row shorter than the header simply lacks
//! the trailing fields (they read as absent, never as zero); extra trailing
//! fields are ignored. Blank lines are skipped.

use super::provider::DataError;
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;

/// One data row, keyed by header name. Values are untyped strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    line: u64,
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// Raw value of a column, `None` when the row has no field at that position.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(|s| s.as_str())
    }

    /// 1-based line number in the source text.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Number of fields present in this row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A parsed CSV document.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    /// Rows with fewer fields than the header row.
    pub short_rows: usize,
    /// Rows the CSV reader could not decode at all.
    pub unreadable_rows: usize,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse comma-delimited text with a header row.
///
/// Fails only when there is no usable header row. Individual rows the reader
/// cannot decode are counted and skipped.
pub fn parse_csv(text: &str) -> Result<RawTable, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::MalformedCsv(format!("header row: {e}")))?
        .iter()
        .map(|h| strip_quotes(h).to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(DataError::EmptyPayload("no header row".into()));
    }

    let mut table = RawTable {
        headers,
        ..RawTable::default()
    };

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("csv.row.skipped reason={e}");
                table.unreadable_rows += 1;
                continue;
            }
        };

        // Whitespace-only lines survive the reader as a single empty field.
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        if record.len() < table.headers.len() {
            table.short_rows += 1;
        }

        let mut fields = HashMap::with_capacity(table.headers.len());
        for (header, value) in table.headers.iter().zip(record.iter()) {
            // First occurrence of a duplicated header wins.
            fields
                .entry(header.clone())
                .or_insert_with(|| strip_quotes(value).to_string());
        }

        table.records.push(RawRecord {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            fields,
        });
    }

    Ok(table)
}

/// Trim whitespace and any stray double quotes around a field.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}
