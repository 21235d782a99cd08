//! Descriptive statistics over valid-value subsets.

use crate::domain::{EtfRecord, Metric};

/// Valid values of a metric, in record order.
pub fn valid_values(records: &[EtfRecord], metric: Metric) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.metric(metric))
        .filter(|v| v.is_finite())
        .collect()
}

/// Sum of values; 0 for empty input.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Sum of values, `None` for empty input.
pub fn sum_opt(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| sum(values))
}

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| sum(values) / values.len() as f64)
}

/// Median; `None` for empty input.
pub fn median_opt(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median with the 0 sentinel for empty input. Callers that render a KPI
/// should use [`median_opt`] to tell "no data" apart from a true zero.
pub fn median(values: &[f64]) -> f64 {
    median_opt(values).unwrap_or(0.0)
}
