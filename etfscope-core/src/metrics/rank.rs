//! Top-N rankings.
//!
//! Only finite, strictly positive values take part; everything else is left
//! out of the ranking rather than ranked last. Ties keep input order.

use crate::domain::{EtfRecord, Metric};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub symbol: String,
    pub metric_value: f64,
}

/// Rank `(symbol, value)` pairs descending and keep the first `n`.
pub fn top_n<'a, I>(entries: I, n: usize) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut ranked: Vec<RankedEntry> = entries
        .into_iter()
        .filter_map(|(symbol, value)| match value {
            Some(v) if v.is_finite() && v > 0.0 => Some(RankedEntry {
                symbol: symbol.to_string(),
                metric_value: v,
            }),
            _ => None,
        })
        .collect();

    // sort_by is stable: equal values keep their input order.
    ranked.sort_by(|a, b| b.metric_value.total_cmp(&a.metric_value));
    ranked.truncate(n);
    ranked
}

/// Rank records by one metric.
pub fn rank_records(records: &[EtfRecord], metric: Metric, n: usize) -> Vec<RankedEntry> {
    top_n(
        records.iter().map(|r| (r.symbol.as_str(), r.metric(metric))),
        n,
    )
}
