//! State confirmation with retry
//!
//! When a receipt does not say whether a call succeeded, the effect is
//! confirmed by re-reading contract state until it shows the expected value.
//! Backoff is exponential by default; a multiplier of 1.0 gives a fixed
//! interval.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DeployerError, Result};

/// State-confirmation retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total reads, including the first
    pub max_attempts: u32,
    /// Delay after the first mismatch
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// Growth factor per attempt (1.0 = fixed interval)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Fixed-interval policy
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: interval,
            max_backoff: interval,
            backoff_multiplier: 1.0,
        }
    }

    /// Backoff after the given failed attempt (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_secs = self.initial_backoff.as_secs_f64()
            * self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// Progress of one confirmation call
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempts_made: u32,
    pub expected: String,
    pub last_observed: Option<String>,
}

impl RetryState {
    fn new(expected: String) -> Self {
        Self {
            attempts_made: 0,
            expected,
            last_observed: None,
        }
    }

    fn record(&mut self, observed: String) {
        self.attempts_made += 1;
        self.last_observed = Some(observed);
    }

    /// Diagnostic for the last mismatch
    pub fn reason(&self) -> String {
        format!(
            "Transaction Failed. Expected: {} Actual: {}",
            self.expected,
            self.last_observed.as_deref().unwrap_or("<none>")
        )
    }

    fn into_error(self) -> DeployerError {
        DeployerError::StateMismatch {
            expected: self.expected,
            observed: self.last_observed.unwrap_or_else(|| "<none>".to_string()),
            attempts: self.attempts_made,
        }
    }
}

/// Equal either as values or in string form.
///
/// Chain clients hand back numbers and addresses in more than one
/// representation; both sides are compared as rendered text too.
pub fn state_matches<T, E>(actual: &T, expected: &E) -> bool
where
    T: PartialEq<E> + Display,
    E: Display + ?Sized,
{
    actual == expected || actual.to_string() == expected.to_string()
}

/// Re-read `read` until it returns `expected` or the policy is exhausted.
///
/// Errors from `read` propagate immediately; only a mismatch is retried.
/// After the last attempt the error carries the final observed value.
pub async fn confirm_state<F, Fut, T, E>(
    mut read: F,
    expected: &E,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: PartialEq<E> + Display,
    E: Display + ?Sized,
{
    let mut state = RetryState::new(expected.to_string());

    loop {
        let actual = read().await?;
        if state_matches(&actual, expected) {
            debug!(
                expected = %state.expected,
                attempt = state.attempts_made + 1,
                "State confirmed"
            );
            return Ok(());
        }

        state.record(actual.to_string());

        if !policy.should_retry(state.attempts_made) {
            warn!(
                attempts = state.attempts_made,
                reason = %state.reason(),
                "State confirmation exhausted"
            );
            return Err(state.into_error());
        }

        let backoff = policy.backoff_for_attempt(state.attempts_made - 1);
        warn!(
            attempt = state.attempts_made,
            max = policy.max_attempts,
            backoff_ms = backoff.as_millis() as u64,
            reason = %state.reason(),
            "Retrying state confirmation"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(DeployerError::Cancelled("confirming state"));
            }
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}
