//! Overview: headline KPIs and the two distribution charts.

use super::Panel;
use crate::data::summary::SummaryKpis;
use crate::domain::{EtfRecord, Metric};
use crate::metrics::histogram::{BinSpec, Histogram};
use crate::metrics::stats::{median_opt, sum_opt, valid_values};
use serde::{Deserialize, Serialize};

/// Which values fed the trailing P/E histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeSource {
    Summary,
    Records,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewView {
    pub record_count: usize,
    pub total_assets: Panel<f64>,
    /// Fraction.
    pub median_three_year_return: Panel<f64>,
    /// Fraction.
    pub median_five_year_return: Panel<f64>,
    pub dividend_yield: Panel<Histogram>,
    pub trailing_pe: Panel<Histogram>,
    pub pe_source: PeSource,
    /// Figures published by the summary dataset, when one was loaded.
    pub reported: Option<SummaryKpis>,
}

impl OverviewView {
    pub fn build(records: &[EtfRecord], summary: Option<&SummaryKpis>) -> Self {
        let (pe_values, pe_source) = match summary {
            Some(kpis) if !kpis.trailing_pe_distribution.is_empty() => {
                (kpis.trailing_pe_distribution.clone(), PeSource::Summary)
            }
            _ => (valid_values(records, Metric::TrailingPe), PeSource::Records),
        };

        let dividend_yield = BinSpec::dividend_yield().bucket(&valid_values(records, Metric::DividendYield));
        let trailing_pe = BinSpec::trailing_pe().bucket(&pe_values);
        if dividend_yield.out_of_range > 0 || trailing_pe.out_of_range > 0 {
            log::debug!(
                "overview.out_of_range dividend_yield={} trailing_pe={}",
                dividend_yield.out_of_range,
                trailing_pe.out_of_range
            );
        }

        Self {
            record_count: records.len(),
            total_assets: Panel::from_option(sum_opt(&valid_values(records, Metric::TotalAssets))),
            median_three_year_return: Panel::from_option(median_opt(&valid_values(
                records,
                Metric::ThreeYearReturn,
            ))),
            median_five_year_return: Panel::from_option(median_opt(&valid_values(
                records,
                Metric::FiveYearReturn,
            ))),
            dividend_yield: histogram_panel(dividend_yield),
            trailing_pe: histogram_panel(trailing_pe),
            pe_source,
            reported: summary.filter(|k| !k.is_empty()).cloned(),
        }
    }
}

fn histogram_panel(histogram: Histogram) -> Panel<Histogram> {
    if histogram.is_empty() {
        Panel::NoData
    } else {
        Panel::Ready(histogram)
    }
}
