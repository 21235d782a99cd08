//! Dataset loading with cache and fallback policy.
//!
//! For each dataset:
//! 1. If a fresh cache entry exists → parse it
//! 2. Otherwise fetch from the source → parse, then write the raw text to the cache
//! 3. If that fails and a local secondary file is configured → parse that
//! 4. Otherwise → the built-in fallback dataset (always succeeds, tagged)
//!
//! A load never fails outright: every failure is logged, recorded in
//! `warnings`, and the next step is tried.

use super::cache::{get_fresh, Cache};
use super::clean::{clean_csv, CleanedDataset};
use super::fallback;
use super::provider::{DataError, DataOrigin, DataProvider, DatasetSource};
use super::summary::{parse_summary, SummaryKpis};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

/// Options controlling how datasets are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How long a cached dataset stays fresh.
    pub ttl: Duration,
    /// If false, never read or write the cache.
    pub use_cache: bool,
    /// Local per-ETF file tried when the primary source fails.
    pub local_fallback: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(60),
            use_cache: true,
            local_fallback: None,
        }
    }
}

/// A loaded value with its provenance.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    /// Display name of where the value came from.
    pub source: String,
    pub origin: DataOrigin,
    pub value: T,
    /// Failures hit on the way, in the order they happened.
    pub warnings: Vec<String>,
}

impl<T> Loaded<T> {
    pub fn is_fallback(&self) -> bool {
        self.origin.is_fallback()
    }
}

type Parser<T> = fn(&str) -> Result<T, DataError>;

/// Loads datasets through a provider and a cache.
pub struct DatasetLoader<'a> {
    provider: &'a dyn DataProvider,
    cache: &'a dyn Cache,
    opts: LoadOptions,
}

impl<'a> DatasetLoader<'a> {
    pub fn new(provider: &'a dyn DataProvider, cache: &'a dyn Cache, opts: LoadOptions) -> Self {
        Self {
            provider,
            cache,
            opts,
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.opts
    }

    /// Load and clean the per-ETF dataset.
    pub fn load(&self, source: &DatasetSource, now: DateTime<Utc>) -> Loaded<CleanedDataset> {
        let loaded = self.load_with(
            source,
            now,
            clean_csv,
            self.opts.local_fallback.as_ref(),
            fallback::etf_dataset,
        );
        let report = &loaded.value.report;
        log::info!(
            "dataset.loaded source={} origin={:?} rows_read={} rows_kept={} rejected={}",
            loaded.source,
            loaded.origin,
            report.rows_read,
            report.rows_kept,
            report.rejected_total()
        );
        loaded
    }

    /// Load the KPI summary dataset.
    pub fn load_summary(&self, source: &DatasetSource, now: DateTime<Utc>) -> Loaded<SummaryKpis> {
        let loaded = self.load_with(source, now, parse_summary, None, fallback::summary);
        log::info!(
            "summary.loaded source={} origin={:?}",
            loaded.source,
            loaded.origin
        );
        loaded
    }

    /// Load the per-ETF and summary datasets concurrently; returns once both complete.
    pub fn load_pair(
        &self,
        etfs: &DatasetSource,
        summary: &DatasetSource,
        now: DateTime<Utc>,
    ) -> (Loaded<CleanedDataset>, Loaded<SummaryKpis>) {
        rayon::join(|| self.load(etfs, now), || self.load_summary(summary, now))
    }

    fn load_with<T>(
        &self,
        source: &DatasetSource,
        now: DateTime<Utc>,
        parse: Parser<T>,
        secondary: Option<&PathBuf>,
        builtin: fn() -> T,
    ) -> Loaded<T> {
        let mut warnings = Vec::new();
        let cacheable = self.opts.use_cache && source.is_cacheable();
        let key = source.cache_key();

        // Step 1: Try cache
        if cacheable {
            if let Some(entry) = get_fresh(self.cache, &key, now, self.opts.ttl) {
                match parse(&entry.value) {
                    Ok(value) => {
                        return Loaded {
                            source: source.to_string(),
                            origin: DataOrigin::Cache,
                            value,
                            warnings,
                        };
                    }
                    Err(e) => {
                        log::warn!("cache.unparseable key={key} error={e}");
                        let _ = self.cache.remove(&key);
                    }
                }
            }
        }

        // Step 2: Fetch from the source
        match self.fetch_and_parse(source, parse) {
            Ok((text, value)) => {
                if cacheable {
                    if let Err(e) = self.cache.set(&key, &text, now) {
                        log::warn!("cache.write_failed key={key} error={e}");
                    }
                }
                return Loaded {
                    source: source.to_string(),
                    origin: source.origin(),
                    value,
                    warnings,
                };
            }
            Err(e) => {
                log::warn!("dataset.fetch_failed source={source} error={e}");
                warnings.push(format!("{source}: {e}"));
            }
        }

        // Step 3: Local secondary file
        if let Some(path) = secondary {
            let local = DatasetSource::Local(path.clone());
            if &local != source {
                match self.fetch_and_parse(&local, parse) {
                    Ok((_, value)) => {
                        log::warn!("dataset.secondary source={local}");
                        return Loaded {
                            source: local.to_string(),
                            origin: DataOrigin::Local,
                            value,
                            warnings,
                        };
                    }
                    Err(e) => {
                        log::warn!("dataset.fetch_failed source={local} error={e}");
                        warnings.push(format!("{local}: {e}"));
                    }
                }
            }
        }

        // Step 4: Built-in fallback
        log::warn!("dataset.fallback source={source}");
        Loaded {
            source: fallback::FALLBACK_SOURCE.to_string(),
            origin: DataOrigin::Fallback,
            value: builtin(),
            warnings,
        }
    }

    fn fetch_and_parse<T>(
        &self,
        source: &DatasetSource,
        parse: Parser<T>,
    ) -> Result<(String, T), DataError> {
        log::debug!(
            "dataset.fetch source={source} provider={}",
            self.provider.name()
        );
        let text = self.provider.fetch_text(source)?;
        let value = parse(&text)?;
        Ok((text, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::MemoryCache;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CSV: &str = "symbol,category,threeYearAverageReturn\nAAA,Tech,0.1\nBBB,Tech,0.2\n";

    /// Serves a fixed body for every source and counts calls.
    struct FixedProvider {
        body: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(body: &str) -> Self {
            Self {
                body: Ok(body.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                body: Err(()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_text(&self, source: &DatasetSource) -> Result<String, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body
                .clone()
                .map_err(|_| DataError::NetworkUnreachable(source.to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn remote() -> DatasetSource {
        DatasetSource::parse("https://example.com/etfs.csv")
    }

    #[test]
    fn fetches_then_serves_from_cache() {
        let provider = FixedProvider::ok(CSV);
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

        let first = loader.load(&remote(), now());
        assert_eq!(first.origin, DataOrigin::Remote);
        assert_eq!(first.value.len(), 2);

        let second = loader.load(&remote(), now() + Duration::minutes(10));
        assert_eq!(second.origin, DataOrigin::Cache);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_cache_is_refetched() {
        let provider = FixedProvider::ok(CSV);
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

        loader.load(&remote(), now());
        let later = loader.load(&remote(), now() + Duration::minutes(61));
        assert_eq!(later.origin, DataOrigin::Remote);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_falls_back_to_builtin() {
        let provider = FixedProvider::failing();
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

        let loaded = loader.load(&remote(), now());
        assert!(loaded.is_fallback());
        assert!(!loaded.value.is_empty());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_symbol_header_counts_as_failure() {
        let provider = FixedProvider::ok("name,category\nFoo,Tech\n");
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

        let loaded = loader.load(&remote(), now());
        assert!(loaded.is_fallback());
        assert!(loaded.warnings[0].contains("symbol"));
        assert!(cache.is_empty());
    }

    #[test]
    fn no_cache_option_skips_cache() {
        let provider = FixedProvider::ok(CSV);
        let cache = MemoryCache::new();
        let opts = LoadOptions {
            use_cache: false,
            ..LoadOptions::default()
        };
        let loader = DatasetLoader::new(&provider, &cache, opts);
        loader.load(&remote(), now());
        loader.load(&remote(), now());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn load_pair_returns_both() {
        let provider = FixedProvider::ok(CSV);
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

        let summary = DatasetSource::parse("https://example.com/summary.csv");
        let (etfs, kpis) = loader.load_pair(&remote(), &summary, now());
        assert_eq!(etfs.value.len(), 2);
        // A per-ETF CSV served as the summary is not a summary.
        assert!(kpis.is_fallback());
        assert!(cache.get(&summary.cache_key()).is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn malformed_summary_body_falls_back_uncached() {
        let summary = DatasetSource::parse("https://example.com/summary.csv");
        for body in ["<html><body>502 Bad Gateway</body></html>", CSV] {
            let provider = FixedProvider::ok(body);
            let cache = MemoryCache::new();
            let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());

            let loaded = loader.load_summary(&summary, now());
            assert_eq!(loaded.origin, DataOrigin::Fallback);
            assert_eq!(loaded.value, fallback::summary());
            assert_eq!(loaded.warnings.len(), 1);
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn valid_summary_is_cached() {
        let provider = FixedProvider::ok("metric,value\nTotal Assets,500\n");
        let cache = MemoryCache::new();
        let loader = DatasetLoader::new(&provider, &cache, LoadOptions::default());
        let summary = DatasetSource::parse("https://example.com/summary.csv");

        let loaded = loader.load_summary(&summary, now());
        assert_eq!(loaded.origin, DataOrigin::Remote);
        assert_eq!(loaded.value.total_assets, Some(500.0));
        assert_eq!(
            loader.load_summary(&summary, now()).origin,
            DataOrigin::Cache
        );
    }
}
