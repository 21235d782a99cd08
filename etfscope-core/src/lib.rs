//! etfscope core: ETF dataset pipeline, metrics and views.
//!
//! This crate contains everything between raw CSV text and chart-ready data:
//! - Ingestion with header-name column resolution
//! - Field cleaning against per-field valid domains
//! - Cache-first loading with local and built-in fallbacks
//! - Histograms, top-N rankings, category aggregates, descriptive stats
//! - Overview / top performers / category views with explicit "no data" panels
//! - Real-time quotes with a rate-limit gate

pub mod config;
pub mod data;
pub mod domain;
pub mod metrics;
pub mod quote;
pub mod views;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a loader or view may hand across a
    /// rayon join is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::EtfRecord>();
        require_sync::<domain::EtfRecord>();
        require_send::<data::CleanedDataset>();
        require_sync::<data::CleanedDataset>();
        require_send::<data::SummaryKpis>();
        require_sync::<data::SummaryKpis>();
        require_send::<data::Loaded<data::CleanedDataset>>();
        require_sync::<data::FileCache>();
        require_sync::<data::MemoryCache>();
        require_sync::<data::SourceProvider>();
        require_send::<metrics::Histogram>();
        require_send::<metrics::CategoryReport>();
        require_send::<views::OverviewView>();
        require_send::<views::CategoryView>();
        require_send::<views::TopPerformersView>();
        require_sync::<quote::RateLimitGate>();
        require_send::<quote::QuoteSnapshot>();
    }
}
