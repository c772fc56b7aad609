//! Bounded retry with jittered backoff, plus the timeout guard used by
//! long-running stage operations.
//!
//! Every discovery step and extraction stage goes through [`retry_stage`];
//! whole items are additionally wrapped at a coarser grain for total
//! navigation failure. Delays carry random noise so repeated attempts never
//! produce a uniform timing signature.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::error::{ScrapeError, ScrapeResult};

/// Retry behavior for one wrapped operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt after that.
    pub base_delay_ms: u64,
    /// Ceiling for the computed delay, before jitter.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Jittered backoff delay preceding the given attempt (1-based).
    fn delay_before(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(8);
        let base = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        let noise = {
            let mut rng = rand::rng();
            rng.random_range(0..=base / 4 + 1)
        };
        Duration::from_millis(base + noise)
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping a jittered backoff
/// between attempts.
///
/// Non-retryable errors (see [`ScrapeError::is_retryable`]) and exhaustion
/// both surface the last error to the caller, which decides whether that
/// degrades an artifact or fails the item.
pub async fn retry_stage<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> ScrapeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScrapeResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt == attempts {
                    return Err(e);
                }
                debug!("{operation}: attempt {attempt}/{attempts} failed: {e}");
                last_err = Some(e);
                tokio::time::sleep(policy.delay_before(attempt + 1)).await;
            }
        }
    }

    // Unreachable with attempts >= 1; kept for the type checker.
    Err(last_err.unwrap_or_else(|| ScrapeError::TransientUi(format!("{operation} never ran"))))
}

/// Randomized inter-action delay within `[min_ms, max_ms]`, with extra noise.
pub async fn smart_delay(min_ms: u64, max_ms: u64) {
    let millis = {
        let mut rng = rand::rng();
        let upper = max_ms.max(min_ms + 1);
        rng.random_range(min_ms..upper) + rng.random_range(50..250)
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Bound `operation` to `seconds`, converting expiry into the distinguished
/// timeout condition the enclosing stage treats as stage failure.
pub async fn with_timeout<T, F>(operation: F, seconds: u64, name: &str) -> ScrapeResult<T>
where
    F: Future<Output = ScrapeResult<T>>,
{
    match tokio::time::timeout(Duration::from_secs(seconds), operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{name} exceeded its {seconds}s budget");
            Err(ScrapeError::timeout(name, seconds))
        }
    }
}
