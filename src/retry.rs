//! # Retry Policy
//!
//! Exponential-backoff executor used for backend connection setup and for query fetches.
//!
//! ## Schedule
//!
//! After failed attempt `k` (1-based) the policy waits
//! `min(initial_delay_ms * backoff_multiplier^(k-1), max_delay_ms)` before attempt `k + 1`.
//! With the default config (5 attempts, 1s initial, x2, 10s cap) the waits are
//! `1s, 2s, 4s, 8s`.
//!
//! ## Cancellation
//!
//! [`RetryPolicy::cancel`] is cooperative. The flag is checked before every attempt and the
//! backoff sleep wakes up as soon as it is raised. An attempt that is already running is
//! never interrupted; its result is simply the last one the policy hands back.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Backoff parameters. Fixed once a [`RetryPolicy`] has been built from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Default backoff with a different attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Checks the invariants between the fields.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::NoAttempts);
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(RetryConfigError::DelayBelowInitial {
                max_delay_ms: self.max_delay_ms,
                initial_delay_ms: self.initial_delay_ms,
            });
        }
        if !(self.backoff_multiplier >= 1.0 && self.backoff_multiplier.is_finite()) {
            return Err(RetryConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }

    /// Wait that follows failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// A [`RetryConfig`] whose fields contradict each other.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq)]
pub enum RetryConfigError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,
    #[error("max_delay_ms ({max_delay_ms}) must not be below initial_delay_ms ({initial_delay_ms})")]
    DelayBelowInitial {
        max_delay_ms: u64,
        initial_delay_ms: u64,
    },
    #[error("backoff_multiplier must be a finite value >= 1 (got {0})")]
    InvalidMultiplier(f64),
}

/// Passed to the `on_retry` observer after every failed, non-final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// The attempt that just failed.
    pub attempt: u32,
    pub next_retry_at: Option<Instant>,
    pub delay: Duration,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RetryError<E> {
    #[error("Retry cancelled")]
    Cancelled,
    #[error("Max retry attempts reached")]
    MaxAttemptsReached,
    /// The final attempt's own error, untouched.
    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }
}

/// Runs an async operation until it succeeds, the attempt budget runs out, or it is cancelled.
///
/// The attempt counter is reset by every `execute` call, so one policy must not drive two
/// executions at the same time. Share it behind an `Arc` when another task needs to cancel it.
pub struct RetryPolicy {
    config: RetryConfig,
    current_attempt: AtomicU32,
    cancelled: watch::Sender<bool>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            config,
            current_attempt: AtomicU32::new(0),
            cancelled,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt.load(Ordering::SeqCst)
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Raises the cancellation flag. Sticky: a cancelled policy stays cancelled.
    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_with(operation, |_| {}).await
    }

    /// Like [`execute`](Self::execute), reporting each scheduled retry to `on_retry`.
    pub async fn execute_with<T, E, F, Fut, R>(
        &self,
        mut operation: F,
        mut on_retry: R,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        R: FnMut(RetryState),
    {
        let max_attempts = self.config.max_attempts;
        self.current_attempt.store(0, Ordering::SeqCst);

        while self.current_attempt() < max_attempts {
            if self.is_cancelled() {
                debug!(attempt = self.current_attempt(), "Retry cancelled");
                return Err(RetryError::Cancelled);
            }

            let attempt = self.current_attempt.fetch_add(1, Ordering::SeqCst) + 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(attempt, error = %e, "Retry attempts exhausted");
                    return Err(RetryError::Operation(e));
                }
                Err(e) => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    on_retry(RetryState {
                        attempt,
                        next_retry_at: Some(Instant::now() + delay),
                        delay,
                    });
                    self.sleep(delay).await;
                }
            }
        }

        Err(RetryError::MaxAttemptsReached)
    }

    async fn sleep(&self, delay: Duration) {
        let mut cancelled = self.cancelled.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_for_cancel(&mut cancelled) => {}
        }
    }
}

async fn wait_for_cancel(cancelled: &mut watch::Receiver<bool>) {
    loop {
        if *cancelled.borrow_and_update() {
            return;
        }
        if cancelled.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}
