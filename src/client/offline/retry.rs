//! # Retry Policy and Backoff Strategies
//!
//! One policy type drives every retry decision in the client: the offline
//! message queue, the sync operation queue (as `maxRetries`) and the
//! realtime reconnect supervisor.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use shoot_client::client::offline::retry::{BackoffStrategy, RetryPolicy};
//!
//! let policy = RetryPolicy::new(5, BackoffStrategy::Exponential { base_ms: 500, max_ms: 10_000 });
//! assert_eq!(policy.delay_for(1), Duration::from_millis(500));
//! assert_eq!(policy.delay_for(3), Duration::from_millis(2_000));
//! assert!(policy.is_exhausted(5));
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default retry ceiling
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff strategy between attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry on the next pass
    #[default]
    None,
    /// Fixed interval between retries
    Fixed {
        /// Interval in milliseconds
        interval_ms: u64,
    },
    /// Doubling interval, capped
    Exponential {
        /// First interval in milliseconds
        base_ms: u64,
        /// Upper bound in milliseconds
        max_ms: u64,
    },
}

/// Retry ceiling plus backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed attempts after which an item leaves automatic processing
    pub max_attempts: u32,
    /// Delay between attempts
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffStrategy::None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self { max_attempts, backoff }
    }

    /// Whether `retry_count` failures reach the ceiling
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_attempts
    }

    /// Delay to wait after `attempt` failures before trying again
    ///
    /// `attempt == 0` (nothing failed yet) never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.backoff {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Fixed { interval_ms } => Duration::from_millis(interval_ms),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                let shift = (attempt - 1).min(32);
                let delay = base_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(delay.min(max_ms))
            }
        }
    }

    /// Whether the backoff delay since `last_attempt` has elapsed at `now`
    pub fn is_due(&self, retry_count: u32, last_attempt: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_attempt else {
            return true;
        };
        let delay = self.delay_for(retry_count);
        if delay.is_zero() {
            return true;
        }
        match chrono::Duration::from_std(delay) {
            Ok(delay) => now >= last + delay,
            Err(_) => false,
        }
    }
}
