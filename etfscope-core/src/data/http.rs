//! Blocking HTTP client for remote CSV snapshots and JSON APIs.
//!
//! One request per call, no retry loop: a failed fetch falls back to the
//! local or built-in dataset upstream, and rate limits are surfaced to the
//! caller instead of being retried.

use super::provider::DataError;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper over a `reqwest` blocking client.
#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::blocking::Client,
}

impl HttpProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("etfscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET a URL and return its body. Non-2xx statuses are errors; HTTP 429
    /// maps to `RateLimited` using the `retry-after` header (default 60s).
    pub fn get_text(&self, url: &str) -> Result<String, DataError> {
        log::debug!("http.get url={}", without_query(url));
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| {
                DataError::NetworkUnreachable(format!(
                    "{}: {}",
                    without_query(url),
                    e.without_url()
                ))
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: without_query(url).to_string(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "unreadable body from {}: {}",
                    without_query(url),
                    e.without_url()
                ))
            })?;
        if body.trim().is_empty() {
            return Err(DataError::EmptyPayload(without_query(url).to_string()));
        }
        Ok(body)
    }
}

/// URL up to the query string. Query strings may carry API keys and never
/// reach logs or error messages.
pub fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
