//! EtfRecord: the cleaned, typed form of one dataset row.

use serde::{Deserialize, Serialize};

/// One ETF after field cleaning.
///
/// Every numeric field is either a finite value inside its domain or `None`.
/// Returns are fractions (0.12 means 12%); dividend yield is already a
/// percentage as published by the source (3.1 means 3.1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfRecord {
    pub symbol: String,
    pub name: String,
    /// Empty when the row carries no category.
    pub category: String,
    pub three_year_return: Option<f64>,
    pub five_year_return: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub total_assets: Option<f64>,
}

impl EtfRecord {
    /// A record with only a symbol; every other field absent.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            category: String::new(),
            three_year_return: None,
            five_year_return: None,
            dividend_yield: None,
            trailing_pe: None,
            total_assets: None,
        }
    }

    /// Value of a metric, if valid.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ThreeYearReturn => self.three_year_return,
            Metric::FiveYearReturn => self.five_year_return,
            Metric::DividendYield => self.dividend_yield,
            Metric::TrailingPe => self.trailing_pe,
            Metric::TotalAssets => self.total_assets,
        }
    }

    pub fn has_category(&self) -> bool {
        !self.category.is_empty()
    }
}

/// Numeric attributes of an ETF that views can rank, bucket or aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ThreeYearReturn,
    FiveYearReturn,
    DividendYield,
    TrailingPe,
    TotalAssets,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::ThreeYearReturn,
        Metric::FiveYearReturn,
        Metric::DividendYield,
        Metric::TrailingPe,
        Metric::TotalAssets,
    ];

    /// Human-readable label for CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::ThreeYearReturn => "3Y Return",
            Metric::FiveYearReturn => "5Y Return",
            Metric::DividendYield => "Dividend Yield",
            Metric::TrailingPe => "Trailing P/E",
            Metric::TotalAssets => "Total Assets",
        }
    }

    /// Whether the metric is stored as a fraction and shown as a percentage.
    pub fn is_fraction(&self) -> bool {
        matches!(self, Metric::ThreeYearReturn | Metric::FiveYearReturn)
    }
}
