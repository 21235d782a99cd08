//! Quote lookups with caching and rate-limit handling.
//!
//! Order per request:
//! 1. Fresh cached snapshot (`quote:<SYMBOL>`) → return it
//! 2. Rate-limit gate closed → `RateLimited` with the remaining countdown,
//!    the provider is not called
//! 3. Provider → cache the snapshot (write-after-success)
//!
//! A rate-limit response trips the gate and the gate state is persisted in
//! the cache so the countdown survives a restart.

use super::rate_limit::{RateLimitGate, RateLimitRecord};
use super::twelve_data::QuoteProvider;
use super::{cache_key, normalize_symbol, QuoteSnapshot};
use crate::data::cache::{get_fresh, Cache};
use crate::data::loader::Loaded;
use crate::data::provider::{DataError, DataOrigin};
use chrono::{DateTime, Duration, Utc};

/// Cache key of the persisted gate state.
pub const RATE_LIMIT_KEY: &str = "rate_limit:quote";

pub struct QuoteService<'a> {
    provider: &'a dyn QuoteProvider,
    cache: &'a dyn Cache,
    gate: RateLimitGate,
    ttl: Duration,
}

impl<'a> QuoteService<'a> {
    /// Build a service, restoring a persisted rate-limit record if one exists.
    pub fn new(provider: &'a dyn QuoteProvider, cache: &'a dyn Cache, ttl: Duration) -> Self {
        let gate = cache
            .get(RATE_LIMIT_KEY)
            .and_then(|entry| serde_json::from_str::<RateLimitRecord>(&entry.value).ok())
            .map(RateLimitGate::restore)
            .unwrap_or_default();
        Self {
            provider,
            cache,
            gate,
            ttl,
        }
    }

    pub fn gate(&self) -> &RateLimitGate {
        &self.gate
    }

    /// Snapshot for a user-entered symbol.
    pub fn snapshot(&self, raw_symbol: &str, now: DateTime<Utc>) -> Result<Loaded<QuoteSnapshot>, DataError> {
        let symbol = normalize_symbol(raw_symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: raw_symbol.trim().to_string(),
        })?;
        let key = cache_key(&symbol);

        // Step 1: Try cache
        if let Some(entry) = get_fresh(self.cache, &key, now, self.ttl) {
            match serde_json::from_str::<QuoteSnapshot>(&entry.value) {
                Ok(snapshot) => {
                    return Ok(Loaded {
                        source: self.provider.name().to_string(),
                        origin: DataOrigin::Cache,
                        value: snapshot,
                        warnings: Vec::new(),
                    });
                }
                Err(e) => {
                    log::warn!("cache.unparseable key={key} error={e}");
                    let _ = self.cache.remove(&key);
                }
            }
        }

        // Step 2: Respect an active rate limit
        if !self.gate.is_allowed(now) {
            let retry_after_secs = self.gate.remaining_secs(now).max(1);
            log::info!("quote.blocked symbol={symbol} retry_after_secs={retry_after_secs}");
            return Err(DataError::RateLimited { retry_after_secs });
        }

        // Step 3: Ask the provider
        match self.provider.fetch_quote(&symbol, now) {
            Ok(snapshot) => {
                self.clear_rate_limit();
                match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        if let Err(e) = self.cache.set(&key, &json, now) {
                            log::warn!("cache.write_failed key={key} error={e}");
                        }
                    }
                    Err(e) => log::warn!("quote.serialize_failed symbol={symbol} error={e}"),
                }
                log::info!(
                    "quote.fetched symbol={symbol} price={} points={}",
                    snapshot.current_price,
                    snapshot.prices.len()
                );
                Ok(Loaded {
                    source: self.provider.name().to_string(),
                    origin: DataOrigin::Remote,
                    value: snapshot,
                    warnings: Vec::new(),
                })
            }
            Err(DataError::RateLimited { retry_after_secs }) => {
                let record = self.gate.trip(now, retry_after_secs);
                self.persist_rate_limit(&record, now);
                Err(DataError::RateLimited {
                    retry_after_secs: record.retry_after_secs,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn persist_rate_limit(&self, record: &RateLimitRecord, now: DateTime<Utc>) {
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(e) = self.cache.set(RATE_LIMIT_KEY, &json, now) {
                    log::warn!("cache.write_failed key={RATE_LIMIT_KEY} error={e}");
                }
            }
            Err(e) => log::warn!("quote.rate_limit.serialize_failed error={e}"),
        }
    }

    fn clear_rate_limit(&self) {
        self.gate.reset();
        if let Err(e) = self.cache.remove(RATE_LIMIT_KEY) {
            log::warn!("cache.remove_failed key={RATE_LIMIT_KEY} error={e}");
        }
    }
}
