//! Resilient invocation: key rotation on quota exhaustion, fixed backoff on
//! overload, bounded attempts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::SecretString;
use tracing::{debug, warn};

use crate::classify::{FailureSignal, Outcome};
use crate::error::{Error, Result};
use crate::metrics;
use crate::rotator::KeyRotator;

/// Attempt budget and backoff for resilient calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed per configured key.
    pub sweeps_per_key: usize,
    /// Attempts allowed on top of the per-key budget, so overload retries
    /// still get a few chances with zero or one key.
    pub extra_attempts: usize,
    /// Pause before retrying an overloaded backend.
    pub overload_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            sweeps_per_key: 3,
            extra_attempts: 3,
            overload_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Total attempts for a pool of `keys` keys.
    pub fn max_attempts(&self, keys: usize) -> usize {
        keys * self.sweeps_per_key + self.extra_attempts
    }
}

/// Runs backend operations against the key pool with rotation and retry.
///
/// Cheap to clone; clones share the same rotator.
#[derive(Clone)]
pub struct ResilientInvoker {
    rotator: Arc<KeyRotator>,
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(rotator: Arc<KeyRotator>) -> Self {
        Self::with_policy(rotator, RetryPolicy::default())
    }

    pub fn with_policy(rotator: Arc<KeyRotator>, policy: RetryPolicy) -> Self {
        Self { rotator, policy }
    }

    pub fn rotator(&self) -> &Arc<KeyRotator> {
        &self.rotator
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` with the active key until it succeeds or the budget
    /// runs out.
    ///
    /// `operation` receives the key to use and may be called several times.
    /// `description` names the operation in logs and in
    /// `Error::AttemptsExhausted`.
    ///
    /// - quota exhausted: rotate and retry at once; `DailyLimitReached` if
    ///   the pool has fewer than two keys
    /// - overloaded: sleep `overload_delay`, retry on the same key
    /// - anything else: returned as `Error::Backend` without retrying
    pub async fn execute<T, E, F, Fut>(&self, description: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut(SecretString) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: FailureSignal,
    {
        let max_attempts = self.policy.max_attempts(self.rotator.len());
        let mut attempts = 0;

        while attempts < max_attempts {
            let (key_index, key) = self.rotator.current();
            let outcome = Outcome::from_result(operation(key).await);
            metrics::record_attempt(description, outcome.label());

            match outcome {
                Outcome::Success(value) => {
                    debug!(
                        operation = description,
                        attempt = attempts + 1,
                        ?key_index,
                        "backend call succeeded"
                    );
                    return Ok(value);
                }
                Outcome::OtherFailure(err) => {
                    warn!(
                        operation = description,
                        attempt = attempts + 1,
                        ?key_index,
                        error = %err.message(),
                        "backend call failed, not retrying"
                    );
                    metrics::record_failure("backend");
                    return Err(Error::Backend(err));
                }
                Outcome::QuotaExceeded(err) => {
                    attempts += 1;
                    warn!(
                        operation = description,
                        attempt = attempts,
                        ?key_index,
                        error = %err.message(),
                        "quota exceeded on current key"
                    );
                    if !self.rotator.rotate() {
                        metrics::record_failure("daily_limit");
                        return Err(Error::DailyLimitReached);
                    }
                }
                Outcome::ServerOverloaded(err) => {
                    attempts += 1;
                    warn!(
                        operation = description,
                        attempt = attempts,
                        ?key_index,
                        error = %err.message(),
                        delay_ms = u64::try_from(self.policy.overload_delay.as_millis()).unwrap_or(u64::MAX),
                        "backend overloaded, waiting before retry"
                    );
                    // The last attempt has no retry to wait for.
                    if attempts < max_attempts {
                        tokio::time::sleep(self.policy.overload_delay).await;
                    }
                }
            }
        }

        warn!(operation = description, attempts, "attempt budget exhausted");
        metrics::record_failure("attempts_exhausted");
        Err(Error::AttemptsExhausted {
            description: description.to_string(),
            attempts,
        })
    }
}
