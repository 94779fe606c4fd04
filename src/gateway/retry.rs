//! Jittered backoff for rate-limit and transport retries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget and delays.
///
/// Rate-limited attempts (HTTP 429) back off exponentially; transport failures
/// wait a flat delay. Both draw from the same attempt counter, so a request
/// makes at most `max_retries + 1` network attempts in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rate_limit_base_ms: u64,
    pub rate_limit_cap_ms: u64,
    pub rate_limit_jitter_ms: u64,
    pub transport_base_ms: u64,
    pub transport_jitter_ms: u64,
    /// Disable to get the deterministic base delays only.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            rate_limit_base_ms: 1000,
            rate_limit_cap_ms: 5000,
            rate_limit_jitter_ms: 300,
            transport_base_ms: 500,
            transport_jitter_ms: 400,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// `min(base * 2^attempt, cap)`, without jitter. `attempt` is 0-based.
    pub fn rate_limit_base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self
            .rate_limit_base_ms
            .saturating_mul(factor)
            .min(self.rate_limit_cap_ms);
        Duration::from_millis(delay)
    }

    /// Delay before retrying a 429: exponential base plus `[0, jitter)` ms.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_base_delay(attempt) + self.sample_jitter(self.rate_limit_jitter_ms)
    }

    /// Delay before retrying a transport failure: flat base plus `[0, jitter)` ms.
    pub fn transport_delay(&self) -> Duration {
        Duration::from_millis(self.transport_base_ms) + self.sample_jitter(self.transport_jitter_ms)
    }

    fn sample_jitter(&self, bound_ms: u64) -> Duration {
        if !self.jitter || bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..bound_ms))
    }
}
