//! Expected columns of the per-ETF dataset and header-name resolution.
//!
//! Column positions are always looked up by header name, once per parse.
//! Nothing downstream indexes fields positionally.

use super::provider::DataError;
use std::collections::HashMap;
use std::fmt;

/// A column the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Symbol,
    LongName,
    Category,
    ThreeYearReturn,
    FiveYearReturn,
    DividendYield,
    TrailingPe,
    TotalAssets,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Symbol,
        Column::LongName,
        Column::Category,
        Column::ThreeYearReturn,
        Column::FiveYearReturn,
        Column::DividendYield,
        Column::TrailingPe,
        Column::TotalAssets,
    ];

    /// Accepted header names, in order of preference. The first is canonical.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Symbol => &["symbol"],
            Column::LongName => &["longName", "name"],
            Column::Category => &["category"],
            Column::ThreeYearReturn => &["threeYearAverageReturn", "threeYearReturn"],
            Column::FiveYearReturn => &["fiveYearAverageReturn", "fiveYearReturn"],
            Column::DividendYield => &["dividendYield"],
            Column::TrailingPe => &["trailingPE"],
            Column::TotalAssets => &["totalAssets"],
        }
    }

    pub fn canonical(&self) -> &'static str {
        self.aliases()[0]
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Column → actual header name, resolved from one header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    resolved: HashMap<Column, String>,
}

impl ColumnMap {
    /// Resolve every known column against a header row.
    ///
    /// An exact alias match wins over a case-insensitive one; earlier aliases
    /// win over later ones.
    pub fn resolve(headers: &[String]) -> Self {
        let mut resolved = HashMap::new();
        for column in Column::ALL {
            if let Some(header) = find_header(headers, column) {
                resolved.insert(column, header.to_string());
            }
        }
        Self { resolved }
    }

    /// Actual header name for a column, if present.
    pub fn header(&self, column: Column) -> Option<&str> {
        self.resolved.get(&column).map(|s| s.as_str())
    }

    pub fn has(&self, column: Column) -> bool {
        self.resolved.contains_key(&column)
    }

    /// Fail with `MissingColumn` for the first absent column.
    pub fn require(&self, columns: &[Column]) -> Result<(), DataError> {
        for column in columns {
            if !self.has(*column) {
                return Err(DataError::MissingColumn {
                    column: column.canonical().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Known columns that the header row does not provide.
    pub fn missing(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| !self.has(*c))
            .collect()
    }
}

fn find_header(headers: &[String], column: Column) -> Option<&str> {
    for alias in column.aliases() {
        if let Some(h) = headers.iter().find(|h| h.as_str() == *alias) {
            return Some(h.as_str());
        }
    }
    for alias in column.aliases() {
        if let Some(h) = headers.iter().find(|h| h.eq_ignore_ascii_case(alias)) {
            return Some(h.as_str());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_canonical_headers() {
        let map = ColumnMap::resolve(&headers(&[
            "symbol",
            "longName",
            "category",
            "threeYearAverageReturn",
            "fiveYearAverageReturn",
            "dividendYield",
            "trailingPE",
            "totalAssets",
        ]));
        assert!(map.missing().is_empty());
        assert_eq!(map.header(Column::TrailingPe), Some("trailingPE"));
    }

    #[test]
    fn resolves_alternate_return_headers() {
        let map = ColumnMap::resolve(&headers(&["symbol", "threeYearReturn", "fiveYearReturn"]));
        assert_eq!(map.header(Column::ThreeYearReturn), Some("threeYearReturn"));
        assert_eq!(map.header(Column::FiveYearReturn), Some("fiveYearReturn"));
    }

    #[test]
    fn prefers_first_alias_when_both_present() {
        let map = ColumnMap::resolve(&headers(&[
            "symbol",
            "threeYearReturn",
            "threeYearAverageReturn",
        ]));
        assert_eq!(
            map.header(Column::ThreeYearReturn),
            Some("threeYearAverageReturn")
        );
    }

    #[test]
    fn column_order_does_not_matter() {
        let map = ColumnMap::resolve(&headers(&["totalAssets", "category", "symbol"]));
        assert_eq!(map.header(Column::Symbol), Some("symbol"));
        assert_eq!(map.header(Column::TotalAssets), Some("totalAssets"));
    }

    #[test]
    fn case_insensitive_fallback() {
        let map = ColumnMap::resolve(&headers(&["Symbol", "TRAILINGPE"]));
        assert_eq!(map.header(Column::Symbol), Some("Symbol"));
        assert_eq!(map.header(Column::TrailingPe), Some("TRAILINGPE"));
    }

    #[test]
    fn require_reports_missing_column() {
        let map = ColumnMap::resolve(&headers(&["symbol", "totalAssets"]));
        assert!(map.require(&[Column::Symbol]).is_ok());
        match map.require(&[Column::Symbol, Column::Category]) {
            Err(DataError::MissingColumn { column }) => assert_eq!(column, "category"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_headers_are_not_matched() {
        let map = ColumnMap::resolve(&headers(&["ticker", "sector", "yield"]));
        assert_eq!(map.missing().len(), Column::ALL.len());
    }
}
