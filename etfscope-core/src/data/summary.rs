//! KPI summary dataset: a two-column `metric,value` CSV with pre-computed
//! headline figures for the overview.
//!
//! Returns in this dataset are published in percent and are converted to
//! fractions here, at the ingestion boundary.

use super::clean::{clean_field, parse_number, Domain};
use super::ingest::strip_quotes;
use super::provider::DataError;
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

/// Required first header of the summary document.
pub const METRIC_HEADER: &str = "metric";

pub const TOTAL_ASSETS: &str = "Total Assets";
pub const AVERAGE_3Y_RETURN: &str = "Average 3Y Return";
pub const AVERAGE_5Y_RETURN: &str = "Average 5Y Return";
pub const TRAILING_PE_DISTRIBUTION: &str = "Trailing PE Distribution";

/// Headline figures reported by the summary dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryKpis {
    pub total_assets: Option<f64>,
    /// Fraction.
    pub avg_three_year_return: Option<f64>,
    /// Fraction.
    pub avg_five_year_return: Option<f64>,
    /// Valid trailing P/E values (domain (0, 200)).
    pub trailing_pe_distribution: Vec<f64>,
}

impl SummaryKpis {
    pub fn is_empty(&self) -> bool {
        self.total_assets.is_none()
            && self.avg_three_year_return.is_none()
            && self.avg_five_year_return.is_none()
            && self.trailing_pe_distribution.is_empty()
    }
}

/// Parse a `metric,value` summary document. Unknown metrics are ignored; a
/// document whose first header is not `metric` is a hard ingestion error.
pub fn parse_summary(text: &str) -> Result<SummaryKpis, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::MalformedCsv(format!("summary header: {e}")))?;
    if headers.iter().all(|h| strip_quotes(h).is_empty()) {
        return Err(DataError::EmptyPayload("summary has no header row".into()));
    }
    // Anything else (an HTML error page, a per-ETF CSV) is not a summary.
    let first = headers.get(0).map(strip_quotes).unwrap_or_default();
    if !first.eq_ignore_ascii_case(METRIC_HEADER) {
        return Err(DataError::MissingColumn {
            column: METRIC_HEADER.to_string(),
        });
    }

    let mut kpis = SummaryKpis::default();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("summary.row.skipped reason={e}");
                continue;
            }
        };
        let Some(metric) = record.get(0).map(strip_quotes) else {
            continue;
        };
        // An unquoted list spills over several fields; glue them back together.
        let value = record.iter().skip(1).collect::<Vec<_>>().join(",");

        match metric {
            TOTAL_ASSETS => {
                kpis.total_assets = clean_field(Some(value.as_str()), Domain::TOTAL_ASSETS).value();
            }
            AVERAGE_3Y_RETURN => kpis.avg_three_year_return = percent_to_fraction(&value),
            AVERAGE_5Y_RETURN => kpis.avg_five_year_return = percent_to_fraction(&value),
            TRAILING_PE_DISTRIBUTION => {
                kpis.trailing_pe_distribution = parse_number_list(&value, Domain::TRAILING_PE);
            }
            other => log::debug!("summary.metric.ignored metric={other}"),
        }
    }

    Ok(kpis)
}

fn percent_to_fraction(raw: &str) -> Option<f64> {
    let percent = parse_number(Some(raw))?;
    let fraction = percent / 100.0;
    Domain::RETURN_FRACTION.contains(fraction).then_some(fraction)
}

/// Parse `[12, 14.5, x, 30]` into the values that fall inside `domain`.
pub fn parse_number_list(raw: &str, domain: Domain) -> Vec<f64> {
    strip_quotes(raw)
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .filter_map(|v| clean_field(Some(v), domain).value())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "metric,value\n\
        Total Assets,2847500000000\n\
        Average 3Y Return,8.45\n\
        Average 5Y Return,10.23\n\
        \"Trailing PE Distribution\",\"[12, 14.5, oops, 0, 250, 37]\"\n";

    #[test]
    fn parses_known_metrics() {
        let kpis = parse_summary(SAMPLE).unwrap();
        assert_eq!(kpis.total_assets, Some(2_847_500_000_000.0));
        assert!((kpis.avg_three_year_return.unwrap() - 0.0845).abs() < 1e-12);
        assert!((kpis.avg_five_year_return.unwrap() - 0.1023).abs() < 1e-12);
        assert_eq!(kpis.trailing_pe_distribution, vec![12.0, 14.5, 37.0]);
    }

    #[test]
    fn unquoted_list_is_rejoined() {
        let kpis = parse_summary("metric,value\nTrailing PE Distribution,[10,20,30]\n").unwrap();
        assert_eq!(kpis.trailing_pe_distribution, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn invalid_values_are_absent_not_zero() {
        let kpis = parse_summary("metric,value\nTotal Assets,abc\nAverage 3Y Return,\n").unwrap();
        assert_eq!(kpis.total_assets, None);
        assert_eq!(kpis.avg_three_year_return, None);
        assert!(kpis.is_empty());
    }

    #[test]
    fn unknown_metrics_are_ignored() {
        let kpis = parse_summary("metric,value\nSomething Else,42\n").unwrap();
        assert!(kpis.is_empty());
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(parse_summary("").is_err());
    }

    #[test]
    fn header_is_case_insensitive() {
        let kpis = parse_summary("Metric,Value\nTotal Assets,100\n").unwrap();
        assert_eq!(kpis.total_assets, Some(100.0));
    }

    #[test]
    fn html_body_is_rejected() {
        let err = parse_summary("<html><body>502 Bad Gateway</body></html>").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column } if column == "metric"));
    }

    #[test]
    fn per_etf_csv_is_rejected() {
        let err = parse_summary("symbol,category,threeYearAverageReturn\nAAA,Tech,0.1\n").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }
}
