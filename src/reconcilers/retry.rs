// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for status writes.
//!
//! Status updates race other writers of the same object. A write made from a
//! stale copy is rejected with HTTP 409; [`retry_on_conflict`] re-runs the
//! whole read-modify-write operation with capped exponential backoff until it
//! succeeds or the attempt budget is spent. Any other error fails immediately.

use crate::constants::{
    STATUS_RETRY_INITIAL_MILLIS, STATUS_RETRY_MAX_MILLIS, STATUS_UPDATE_MAX_ATTEMPTS,
};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff with an attempt budget.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_attempts: u32,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_attempts,
            multiplier,
            randomization_factor,
        }
    }

    /// Get the next backoff interval and advance the exponential schedule.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        jittered
    }

    /// Apply randomization (jitter) to an interval.
    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff used for status updates.
///
/// - **Initial interval**: 10ms
/// - **Max interval**: 1 second
/// - **Attempts**: 5
/// - **Multiplier**: 2.0
/// - **Randomization**: ±10%
#[must_use]
pub fn status_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(STATUS_RETRY_INITIAL_MILLIS),
        Duration::from_millis(STATUS_RETRY_MAX_MILLIS),
        STATUS_UPDATE_MAX_ATTEMPTS,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Whether the error is an optimistic-concurrency conflict (HTTP 409).
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

/// Run `operation` with the status backoff, retrying only on conflicts.
///
/// # Errors
///
/// Returns the first non-conflict error, or the last conflict once the
/// attempt budget is exhausted.
pub async fn retry_on_conflict<T, F, Fut>(operation: F, operation_name: &str) -> Result<T, kube::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    retry_on_conflict_with(status_backoff(), operation, operation_name, |_| {}).await
}

/// [`retry_on_conflict`] with an explicit backoff and a hook called before each retry.
///
/// # Errors
///
/// Same as [`retry_on_conflict`].
pub async fn retry_on_conflict_with<T, F, Fut, H>(
    mut backoff: ExponentialBackoff,
    mut operation: F,
    operation_name: &str,
    mut on_conflict: H,
) -> Result<T, kube::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
    H: FnMut(u32),
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Succeeded after conflict retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if is_conflict(&e) && attempt < backoff.max_attempts => {
                on_conflict(attempt);
                let delay = backoff.next_backoff();
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?delay,
                    "Conflict writing a stale copy, will retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
