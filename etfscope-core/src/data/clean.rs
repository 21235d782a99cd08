//! Field cleaning: raw strings → typed, domain-checked values.
//!
//! A field that is absent, unparsable, non-finite or outside its column's
//! domain becomes `None`. Cleaning never fails a row because of one bad field
//! and never substitutes zero for a missing value.
//!
//! Domain table:
//!
//! | column            | valid range  | unit                 |
//! |-------------------|--------------|----------------------|
//! | dividendYield     | (0, 20]      | percent              |
//! | trailingPE        | (0, 200)     | ratio                |
//! | 3Y / 5Y return    | (0, 1)       | fraction             |
//! | totalAssets       | [0, ∞)       | currency units       |

use super::ingest::{parse_csv, strip_quotes, RawRecord, RawTable};
use super::provider::DataError;
use super::schema::{Column, ColumnMap};
use crate::domain::EtfRecord;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Valid range for a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub lower: Bound<f64>,
    pub upper: Bound<f64>,
}

impl Domain {
    pub const DIVIDEND_YIELD: Domain = Domain {
        lower: Bound::Excluded(0.0),
        upper: Bound::Included(20.0),
    };
    pub const TRAILING_PE: Domain = Domain {
        lower: Bound::Excluded(0.0),
        upper: Bound::Excluded(200.0),
    };
    pub const RETURN_FRACTION: Domain = Domain {
        lower: Bound::Excluded(0.0),
        upper: Bound::Excluded(1.0),
    };
    pub const TOTAL_ASSETS: Domain = Domain {
        lower: Bound::Included(0.0),
        upper: Bound::Unbounded,
    };

    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let above = match self.lower {
            Bound::Included(min) => value >= min,
            Bound::Excluded(min) => value > min,
            Bound::Unbounded => true,
        };
        let below = match self.upper {
            Bound::Included(max) => value <= max,
            Bound::Excluded(max) => value < max,
            Bound::Unbounded => true,
        };
        above && below
    }

    /// Domain of a numeric column; `None` for text columns.
    pub fn for_column(column: Column) -> Option<Domain> {
        match column {
            Column::DividendYield => Some(Self::DIVIDEND_YIELD),
            Column::TrailingPe => Some(Self::TRAILING_PE),
            Column::ThreeYearReturn | Column::FiveYearReturn => Some(Self::RETURN_FRACTION),
            Column::TotalAssets => Some(Self::TOTAL_ASSETS),
            Column::Symbol | Column::LongName | Column::Category => None,
        }
    }
}

/// Parse a raw field as a finite float. Absent, empty and non-numeric input is `None`.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let s = strip_quotes(raw?);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Outcome of cleaning one numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Valid(f64),
    /// No value in the source (missing field or empty string).
    Absent,
    /// A value was present but unparsable or outside the domain.
    Rejected,
}

impl FieldValue {
    pub fn value(self) -> Option<f64> {
        match self {
            FieldValue::Valid(v) => Some(v),
            FieldValue::Absent | FieldValue::Rejected => None,
        }
    }
}

/// Clean one numeric field against a domain.
pub fn clean_field(raw: Option<&str>, domain: Domain) -> FieldValue {
    let present = raw.map(strip_quotes).filter(|s| !s.is_empty());
    if present.is_none() {
        return FieldValue::Absent;
    }
    match parse_number(present) {
        Some(v) if domain.contains(v) => FieldValue::Valid(v),
        _ => FieldValue::Rejected,
    }
}

/// Per-dataset cleaning statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_without_symbol: usize,
    pub short_rows: usize,
    pub unreadable_rows: usize,
    /// Present-but-invalid field values, per column.
    pub rejected: BTreeMap<Column, usize>,
}

impl CleaningReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Cleaned records plus the header resolution they were read with.
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    pub records: Vec<EtfRecord>,
    pub columns: ColumnMap,
    pub report: CleaningReport,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse and clean a per-ETF CSV document in one step.
pub fn clean_csv(text: &str) -> Result<CleanedDataset, DataError> {
    let table = parse_csv(text)?;
    clean_table(&table)
}

/// Clean a parsed table. A missing `symbol` header is a hard ingestion error.
pub fn clean_table(table: &RawTable) -> Result<CleanedDataset, DataError> {
    let columns = ColumnMap::resolve(&table.headers);
    columns.require(&[Column::Symbol])?;

    let mut report = CleaningReport {
        rows_read: table.records.len(),
        short_rows: table.short_rows,
        unreadable_rows: table.unreadable_rows,
        ..CleaningReport::default()
    };

    let mut records = Vec::with_capacity(table.records.len());
    for raw in &table.records {
        match clean_record(raw, &columns, &mut report) {
            Some(rec) => records.push(rec),
            None => report.rows_without_symbol += 1,
        }
    }
    report.rows_kept = records.len();

    Ok(CleanedDataset {
        records,
        columns,
        report,
    })
}

/// Clean one row. Rows without a symbol are dropped (`None`).
pub fn clean_record(
    raw: &RawRecord,
    columns: &ColumnMap,
    report: &mut CleaningReport,
) -> Option<EtfRecord> {
    let text = |column: Column| -> String {
        columns
            .header(column)
            .and_then(|h| raw.get(h))
            .map(|v| strip_quotes(v).to_string())
            .unwrap_or_default()
    };

    let symbol = text(Column::Symbol);
    if symbol.is_empty() {
        return None;
    }

    let mut number = |column: Column| -> Option<f64> {
        let domain = Domain::for_column(column)?;
        let value = clean_field(columns.header(column).and_then(|h| raw.get(h)), domain);
        if value == FieldValue::Rejected {
            *report.rejected.entry(column).or_insert(0) += 1;
        }
        value.value()
    };

    Some(EtfRecord {
        three_year_return: number(Column::ThreeYearReturn),
        five_year_return: number(Column::FiveYearReturn),
        dividend_yield: number(Column::DividendYield),
        trailing_pe: number(Column::TrailingPe),
        total_assets: number(Column::TotalAssets),
        name: text(Column::LongName),
        category: text(Column::Category),
        symbol,
    })
}
