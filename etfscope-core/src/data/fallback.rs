//! Built-in datasets served when every configured source has failed.

use super::clean::{clean_csv, CleanedDataset};
use super::summary::SummaryKpis;

/// Per-ETF snapshot compiled into the binary.
pub const FALLBACK_ETFS_CSV: &str = include_str!("../../data/fallback_etfs.csv");

/// Name used for the built-in dataset in logs and view metadata.
pub const FALLBACK_SOURCE: &str = "built-in";

/// Parse the built-in per-ETF dataset.
///
/// The embedded CSV is covered by tests; if it ever fails to parse the loader
/// still gets an (empty) dataset instead of a panic.
pub fn etf_dataset() -> CleanedDataset {
    match clean_csv(FALLBACK_ETFS_CSV) {
        Ok(dataset) => dataset,
        Err(e) => {
            log::error!("dataset.fallback.invalid error={e}");
            CleanedDataset::default()
        }
    }
}

/// Headline KPIs shown when the summary dataset can't be loaded.
pub fn summary() -> SummaryKpis {
    SummaryKpis {
        total_assets: Some(2_847_500_000_000.0),
        avg_three_year_return: Some(0.0845),
        avg_five_year_return: Some(0.1023),
        trailing_pe_distribution: vec![
            12.0, 14.0, 18.0, 20.0, 25.0, 22.0, 28.0, 32.0, 37.0, 45.0, 50.0, 60.0,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::Column;

    #[test]
    fn embedded_dataset_is_clean() {
        let dataset = etf_dataset();
        assert!(dataset.len() >= 20);
        assert_eq!(dataset.report.rejected_total(), 0);
        assert_eq!(dataset.report.rows_without_symbol, 0);
        assert!(dataset.columns.missing().is_empty());
        assert!(dataset.columns.has(Column::Category));
    }

    #[test]
    fn embedded_returns_are_fractions() {
        for record in etf_dataset().records {
            if let Some(r) = record.three_year_return {
                assert!(r > 0.0 && r < 1.0, "{} 3y={r}", record.symbol);
            }
        }
    }

    #[test]
    fn fallback_summary_matches_published_figures() {
        let kpis = summary();
        assert_eq!(kpis.total_assets, Some(2.8475e12));
        assert_eq!(kpis.avg_three_year_return, Some(0.0845));
        assert!(!kpis.is_empty());
    }
}
