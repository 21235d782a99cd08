//! Twelve Data quote provider.
//!
//! Two requests per snapshot: `/quote` for the latest close and daily change,
//! `/time_series` (1day interval) for the price trend. Twelve Data reports
//! most errors with HTTP 200 and a `{"status":"error","code":..,"message":..}`
//! body, so rate limits and unknown symbols are detected from the payload.

use super::{PricePoint, QuoteSnapshot};
use crate::data::http::HttpProvider;
use crate::data::provider::DataError;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
pub const DEFAULT_API_KEY_ENV: &str = "TWELVE_DATA_API_KEY";
pub const DEFAULT_HISTORY_DAYS: u32 = 45;

/// Trait for quote providers.
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch a snapshot for an already-normalized symbol.
    fn fetch_quote(&self, symbol: &str, now: DateTime<Utc>) -> Result<QuoteSnapshot, DataError>;
}

/// Numbers arrive as JSON strings from Twelve Data; accept either form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Num {
    Float(f64),
    Text(String),
}

impl Num {
    fn value(&self) -> Option<f64> {
        let v = match self {
            Num::Float(v) => *v,
            Num::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

/// Status fields shared by every response.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    status: Option<String>,
    code: Option<u16>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    close: Option<Num>,
    change: Option<Num>,
    percent_change: Option<Num>,
}

#[derive(Debug, Deserialize)]
struct SeriesPayload {
    values: Option<Vec<SeriesValue>>,
}

#[derive(Debug, Deserialize)]
struct SeriesValue {
    datetime: String,
    close: Num,
}

/// Latest-close fields from `/quote`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteFields {
    pub close: f64,
    pub change: Option<f64>,
    /// Fraction.
    pub change_ratio: Option<f64>,
}

/// Twelve Data REST client.
pub struct TwelveDataProvider {
    http: HttpProvider,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    history_days: u32,
}

impl TwelveDataProvider {
    pub fn new(http: HttpProvider, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Some(api_key.into()),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    /// Read the API key from `variable`. A missing key is only reported when a
    /// request actually has to be made, so cached quotes stay readable.
    pub fn from_env(http: HttpProvider, base_url: impl Into<String>, variable: &str) -> Self {
        let api_key = std::env::var(variable)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            log::warn!("quote.api_key_missing variable={variable}");
        }
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            api_key_env: variable.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days.max(1);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, DataError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| DataError::MissingApiKey {
                variable: self.api_key_env.clone(),
            })
    }

    fn quote_url(&self, symbol: &str, key: &str) -> String {
        format!("{}/quote?symbol={symbol}&apikey={key}", self.base_url)
    }

    fn series_url(&self, symbol: &str, key: &str) -> String {
        format!(
            "{}/time_series?symbol={symbol}&interval=1day&outputsize={}&apikey={key}",
            self.base_url, self.history_days
        )
    }
}

impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        "twelve_data"
    }

    fn fetch_quote(&self, symbol: &str, now: DateTime<Utc>) -> Result<QuoteSnapshot, DataError> {
        let key = self.api_key()?;

        let quote_body = self.http.get_text(&self.quote_url(symbol, key))?;
        let fields = parse_quote(symbol, &quote_body, now)?;

        let series_body = self.http.get_text(&self.series_url(symbol, key))?;
        let prices = parse_time_series(symbol, &series_body, now)?;

        Ok(QuoteSnapshot {
            symbol: symbol.to_string(),
            current_price: fields.close,
            daily_change: fields.change,
            daily_change_ratio: fields.change_ratio,
            prices,
        })
    }
}

/// Seconds until the next minute boundary (Twelve Data budgets reset per minute).
pub fn seconds_to_next_minute(now: DateTime<Utc>) -> u64 {
    u64::from(60 - now.second().min(59))
}

fn is_rate_limit(status: &ApiStatus) -> bool {
    if status.code == Some(429) {
        return true;
    }
    status
        .message
        .as_deref()
        .map(|m| {
            let m = m.to_lowercase();
            m.contains("api credits")
                || (m.contains("limit") && ["minute", "day", "daily"].iter().any(|w| m.contains(w)))
        })
        .unwrap_or(false)
}

/// Map an error payload to a typed error; `Ok` when the payload is not an error.
fn check_status(symbol: &str, body: &str, now: DateTime<Utc>) -> Result<(), DataError> {
    let status: ApiStatus = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("invalid JSON for {symbol}: {e}")))?;

    if status.status.as_deref() != Some("error") && status.code != Some(429) {
        return Ok(());
    }

    if is_rate_limit(&status) {
        let retry_after_secs = seconds_to_next_minute(now);
        log::warn!("quote.rate_limited symbol={symbol} retry_after_secs={retry_after_secs}");
        return Err(DataError::RateLimited { retry_after_secs });
    }

    let message = status.message.unwrap_or_default();
    if status.code == Some(404) || message.to_lowercase().contains("not found") {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    Err(DataError::ResponseFormatChanged(format!(
        "error payload for {symbol}: {message}"
    )))
}

/// Parse a `/quote` response.
pub fn parse_quote(symbol: &str, body: &str, now: DateTime<Utc>) -> Result<QuoteFields, DataError> {
    check_status(symbol, body, now)?;
    let payload: QuotePayload = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("quote for {symbol}: {e}")))?;

    let close = payload
        .close
        .as_ref()
        .and_then(Num::value)
        .ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
    let change = payload.change.as_ref().and_then(Num::value);
    let change_ratio = payload
        .percent_change
        .as_ref()
        .and_then(Num::value)
        .map(|p| p / 100.0);

    Ok(QuoteFields {
        close,
        change,
        change_ratio,
    })
}

/// Parse a `/time_series` response into closes, oldest first. Points with an
/// unreadable date or close are skipped.
pub fn parse_time_series(
    symbol: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PricePoint>, DataError> {
    check_status(symbol, body, now)?;
    let payload: SeriesPayload = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("time series for {symbol}: {e}")))?;
    let values = payload.values.ok_or_else(|| {
        DataError::ResponseFormatChanged(format!("time series for {symbol} has no values"))
    })?;

    let mut points: Vec<PricePoint> = values
        .iter()
        .filter_map(|v| {
            let date = v
                .datetime
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            match (date, v.close.value()) {
                (Some(date), Some(price)) => Some(PricePoint { date, price }),
                _ => {
                    log::debug!("quote.point.skipped symbol={symbol} datetime={}", v.datetime);
                    None
                }
            }
        })
        .collect();

    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 15, 30, 40).unwrap()
    }

    #[test]
    fn parses_string_numbers() {
        let body = r#"{"symbol":"QQQ","close":"450.12","change":"-2.50","percent_change":"-0.55"}"#;
        let q = parse_quote("QQQ", body, now()).unwrap();
        assert_eq!(q.close, 450.12);
        assert_eq!(q.change, Some(-2.5));
        assert!((q.change_ratio.unwrap() + 0.0055).abs() < 1e-12);
    }

    #[test]
    fn missing_change_stays_unknown() {
        let body = r#"{"symbol":"QQQ","close":"450.12","change":"n/a"}"#;
        let q = parse_quote("QQQ", body, now()).unwrap();
        assert_eq!(q.change, None);
        assert_eq!(q.change_ratio, None);
    }

    #[test]
    fn other_limits_are_not_rate_limits() {
        let body = r#"{"code":400,"message":"outputsize exceeds the limit of 5000","status":"error"}"#;
        assert!(matches!(
            parse_time_series("QQQ", body, now()),
            Err(DataError::ResponseFormatChanged(_))
        ));
        let daily = r#"{"status":"error","message":"You have reached your daily limit"}"#;
        assert!(matches!(
            parse_quote("QQQ", daily, now()),
            Err(DataError::RateLimited { .. })
        ));
    }

    #[test]
    fn rate_limit_payload_counts_down_to_next_minute() {
        let body = r#"{"code":429,"message":"You have run out of API credits for the current minute.","status":"error"}"#;
        let err = parse_quote("QQQ", body, now()).unwrap_err();
        assert!(matches!(err, DataError::RateLimited { retry_after_secs: 20 }));
    }

    #[test]
    fn credits_message_without_code_is_rate_limit() {
        let body = r#"{"status":"error","message":"API credits exhausted"}"#;
        assert!(matches!(
            parse_quote("QQQ", body, now()),
            Err(DataError::RateLimited { .. })
        ));
    }

    #[test]
    fn unknown_symbol_payload() {
        let body = r#"{"code":400,"message":"**symbol** not found: ZZZZ","status":"error"}"#;
        assert!(matches!(
            parse_quote("ZZZZ", body, now()),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn missing_close_is_symbol_not_found() {
        assert!(matches!(
            parse_quote("QQQ", r#"{"symbol":"QQQ"}"#, now()),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn non_json_is_format_change() {
        assert!(matches!(
            parse_quote("QQQ", "<html>", now()),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn series_is_oldest_first() {
        let body = r#"{"meta":{},"values":[
            {"datetime":"2024-05-31","close":"101.5"},
            {"datetime":"2024-05-30","close":"bad"},
            {"datetime":"2024-05-29","close":"100.0"}
        ],"status":"ok"}"#;
        let points = parse_time_series("QQQ", body, now()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 5, 29).unwrap());
        assert_eq!(points[1].price, 101.5);
    }

    #[test]
    fn series_without_values_is_format_change() {
        assert!(matches!(
            parse_time_series("QQQ", r#"{"status":"ok"}"#, now()),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn next_minute_countdown() {
        let at = |s| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, s).unwrap();
        assert_eq!(seconds_to_next_minute(at(0)), 60);
        assert_eq!(seconds_to_next_minute(at(59)), 1);
    }

    #[test]
    fn missing_key_is_reported_on_fetch() {
        let http = HttpProvider::new().unwrap();
        let provider = TwelveDataProvider::from_env(
            http,
            DEFAULT_BASE_URL,
            "ETFSCOPE_TEST_KEY_THAT_IS_NEVER_SET",
        );
        assert!(!provider.has_api_key());
        let err = provider.fetch_quote("QQQ", now()).unwrap_err();
        assert!(err.is_fatal());
    }
}
