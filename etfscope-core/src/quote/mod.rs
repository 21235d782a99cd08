//! Real-time quotes for a single symbol.
//!
//! The quote service sits next to the dataset pipeline rather than inside it:
//! it has its own provider, its own freshness window, and a rate-limit gate
//! that turns provider throttling into a countdown instead of retries.

pub mod rate_limit;
pub mod service;
pub mod twelve_data;

pub use rate_limit::{RateLimitGate, RateLimitRecord};
pub use service::QuoteService;
pub use twelve_data::{QuoteProvider, TwelveDataProvider};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Latest quote plus recent daily closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub current_price: f64,
    /// `None` when the provider did not report it.
    pub daily_change: Option<f64>,
    /// Fraction. `None` when the provider did not report it.
    pub daily_change_ratio: Option<f64>,
    /// Oldest first.
    pub prices: Vec<PricePoint>,
}

impl QuoteSnapshot {
    /// Whether the day's change is known and positive.
    pub fn is_up(&self) -> bool {
        self.daily_change_ratio
            .or(self.daily_change)
            .is_some_and(|v| v > 0.0)
    }
}

/// Trim and uppercase a user-entered symbol. `None` when nothing is left or
/// when it contains characters no ticker uses.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    let valid = symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    (!symbol.is_empty() && valid).then_some(symbol)
}

/// Cache key for a normalized symbol.
pub fn cache_key(symbol: &str) -> String {
    format!("quote:{symbol}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol("  qqq "), Some("QQQ".into()));
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol("brk.b"), Some("BRK.B".into()));
        assert_eq!(normalize_symbol("SPY&apikey=x"), None);
        assert_eq!(cache_key("SPY"), "quote:SPY");
    }

    #[test]
    fn unknown_change_is_not_up() {
        let mut q = QuoteSnapshot {
            symbol: "QQQ".into(),
            current_price: 100.0,
            daily_change: None,
            daily_change_ratio: None,
            prices: Vec::new(),
        };
        assert!(!q.is_up());
        q.daily_change = Some(1.5);
        assert!(q.is_up());
        q.daily_change_ratio = Some(-0.01);
        assert!(!q.is_up());
    }
}
