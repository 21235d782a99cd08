//! Top performers: three independent rankings.

use super::Panel;
use crate::domain::{EtfRecord, Metric};
use crate::metrics::rank::{rank_records, RankedEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformersView {
    pub top_n: usize,
    /// Values are fractions.
    pub three_year_return: Panel<Vec<RankedEntry>>,
    /// Values are fractions.
    pub five_year_return: Panel<Vec<RankedEntry>>,
    /// Values are percent.
    pub dividend_yield: Panel<Vec<RankedEntry>>,
}

impl TopPerformersView {
    pub fn build(records: &[EtfRecord], top_n: usize) -> Self {
        let rank = |metric| Panel::from_vec(rank_records(records, metric, top_n));
        Self {
            top_n,
            three_year_return: rank(Metric::ThreeYearReturn),
            five_year_return: rank(Metric::FiveYearReturn),
            dividend_yield: rank(Metric::DividendYield),
        }
    }

    /// Panels paired with the metric they rank, in display order.
    pub fn panels(&self) -> [(Metric, &Panel<Vec<RankedEntry>>); 3] {
        [
            (Metric::ThreeYearReturn, &self.three_year_return),
            (Metric::FiveYearReturn, &self.five_year_return),
            (Metric::DividendYield, &self.dividend_yield),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::rank::DEFAULT_TOP_N;

    #[test]
    fn ranks_each_metric_independently() {
        let records: Vec<EtfRecord> = (0..25)
            .map(|i| EtfRecord {
                three_year_return: Some(0.01 * (i + 1) as f64),
                dividend_yield: (i % 2 == 0).then_some(1.0 + i as f64 / 10.0),
                ..EtfRecord::new(format!("E{i:02}"))
            })
            .collect();

        let view = TopPerformersView::build(&records, DEFAULT_TOP_N);
        let three = view.three_year_return.ready().unwrap();
        assert_eq!(three.len(), 20);
        assert_eq!(three[0].symbol, "E24");
        assert_eq!(view.five_year_return, Panel::NoData);
        assert_eq!(view.dividend_yield.ready().unwrap().len(), 13);
    }
}
