//! Bounded exponential-backoff retry around async operations
//!
//! Only errors the taxonomy marks retryable consume attempts; everything else
//! propagates immediately. After exhaustion the final error is returned to
//! the caller, never swallowed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;

use crate::error::ApiError;

/// Backoff policy for a retried operation.
///
/// Defaults mirror the mobile clients: 3 attempts, 1 s initial delay,
/// doubling between attempts, no jitter. Jitter is opt-in via
/// [`with_jitter`](RetryPolicy::with_jitter) to spread retry storms across
/// clients; it scales each delay by a uniform factor in `[1 - j, 1 + j]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
            jitter: 0.0,
        }
    }

    /// Enable jitter; `jitter` is clamped to `[0, 1]`
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to sleep after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31) as i32;
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exp);
        let millis = if self.jitter > 0.0 {
            let factor = 1.0 + self.jitter * rand::thread_rng().gen_range(-1.0..=1.0);
            base * factor.max(0.0)
        } else {
            base
        };
        Duration::from_millis(millis.round() as u64)
    }
}

/// Run `op` under the policy, retrying only retryable failures.
///
/// The operation receives the 1-based attempt number so callers can surface
/// progress ("attempt 2 of 3"). Delays suspend the task via
/// `tokio::time::sleep`; no thread is blocked. No state is shared across
/// concurrent invocations.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                log::debug!(
                    "attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Cancellation handle tied to the caller's lifetime.
///
/// Cloning is cheap; cancelling any clone stops the retried operation at the
/// next attempt boundary or mid-backoff, so an abandoned UI request does not
/// keep retrying after its caller is gone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone; we hold an Arc to it, so this is unreachable,
                // but never spin if it happens.
                return;
            }
        }
    }
}

/// Like [`run_with_retry`], but aborts when `cancel` fires.
///
/// On cancellation the last observed error is returned, or a `Timeout`-kind
/// error if no attempt had completed yet.
pub async fn run_with_retry_cancellable<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let cancelled_err =
        |last: Option<ApiError>| last.unwrap_or_else(|| ApiError::Timeout("Cancelled".to_string()));

    let mut attempt = 1u32;
    let mut last_err: Option<ApiError> = None;
    loop {
        if cancel.is_cancelled() {
            return Err(cancelled_err(last_err));
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                log::debug!(
                    "attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                last_err = Some(err);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(cancelled_err(last_err)),
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
