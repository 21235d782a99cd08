//! Rate-limit gate for the quote provider.
//!
//! When the provider reports that its request budget is spent, the gate
//! records when that happened and how long to wait. Until the wait is over
//! every request is refused locally, so the caller shows a countdown instead
//! of hammering the provider. The record is plain data so it can be persisted
//! in the cache and survive a restart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

const MAX_WAIT_SECS: u64 = 24 * 60 * 60;

/// When the provider throttled us and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub since: DateTime<Utc>,
    pub retry_after_secs: u64,
}

impl RateLimitRecord {
    /// End of the wait. Waits are capped at one day.
    pub fn until(&self) -> DateTime<Utc> {
        let secs = self.retry_after_secs.min(MAX_WAIT_SECS) as i64;
        self.since + Duration::seconds(secs)
    }

    /// Time left before requests are allowed again (zero once expired).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.until() - now).max(Duration::zero())
    }
}

/// Refuses requests while a rate limit is in effect.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    state: Mutex<Option<RateLimitRecord>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate restored from a persisted record.
    pub fn restore(record: RateLimitRecord) -> Self {
        Self {
            state: Mutex::new(Some(record)),
        }
    }

    /// Check if requests are currently allowed. An expired record is cleared.
    pub fn is_allowed(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            None => true,
            Some(record) => {
                if record.remaining(now) > Duration::zero() {
                    false
                } else {
                    *state = None;
                    true
                }
            }
        }
    }

    /// Record a rate-limit response.
    pub fn trip(&self, now: DateTime<Utc>, retry_after_secs: u64) -> RateLimitRecord {
        let record = RateLimitRecord {
            since: now,
            retry_after_secs: retry_after_secs.max(1),
        };
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(record);
        record
    }

    /// Clear the gate after a successful request.
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record(&self) -> Option<RateLimitRecord> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remaining wait (zero if not tripped).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.record()
            .map(|r| r.remaining(now))
            .unwrap_or_else(Duration::zero)
    }

    /// Remaining wait in whole seconds, rounded up, at least 1 while blocked.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.remaining(now);
        if remaining <= Duration::zero() {
            return 0;
        }
        let millis = remaining.num_milliseconds().max(1);
        u64::try_from((millis + 999) / 1000).unwrap_or(1)
    }
}
