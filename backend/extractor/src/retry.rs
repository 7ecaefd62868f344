//! Bounded retries with exponential backoff for stage attempts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How often and how patiently a stage is retried after a bad response.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per stage, the first one included.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay_ms: u64,
    /// Growth factor applied to each further delay.
    pub backoff_factor: f64,
    /// Upper bound for a single delay.
    pub max_delay_ms: u64,
    /// Spread delays by up to ±25% so concurrent metrics do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let raw = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0) as u64;

        if !self.jitter {
            return Duration::from_millis(capped);
        }
        let spread = capped / 4;
        if spread == 0 {
            return Duration::from_millis(capped);
        }
        let offset = next_random() % (spread * 2 + 1);
        Duration::from_millis(capped - spread + offset)
    }

    /// Whether another attempt is allowed after `attempt` attempts have failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// xorshift64; jitter needs spread, not quality.
fn next_random() -> u64 {
    static STATE: AtomicU64 = AtomicU64::new(0x9e37_79b9_7f4a_7c15);
    let mut x = STATE.load(Ordering::Relaxed);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    STATE.store(x, Ordering::Relaxed);
    x
}
