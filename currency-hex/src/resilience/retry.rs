//! Bounded retries under a circuit breaker.

use std::future::Future;
use std::time::Duration;

use currency_types::RateError;

use super::circuit_breaker::CircuitBreaker;

/// How often and how patiently an upstream call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// One logical upstream operation executed with retries, each attempt
/// admitted and accounted by the circuit breaker.
pub struct ResilientCall<'a> {
    name: &'static str,
    breaker: &'a CircuitBreaker,
    policy: RetryPolicy,
}

impl<'a> ResilientCall<'a> {
    pub fn new(name: &'static str, breaker: &'a CircuitBreaker, policy: RetryPolicy) -> Self {
        Self {
            name,
            breaker,
            policy,
        }
    }

    /// Runs `operation` until it succeeds or the attempts are exhausted.
    ///
    /// A rejection by the breaker ends the loop immediately with
    /// [`RateError::CircuitOpen`]; no further attempts are made.
    pub async fn run<T, F, Fut>(self, mut operation: F) -> Result<T, RateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RateError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let permit = match self.breaker.try_acquire() {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::warn!(call = self.name, attempt, "Rejected by circuit breaker");
                    return Err(e);
                }
            };

            match operation().await {
                Ok(value) => {
                    permit.record_success();
                    if attempt > 1 {
                        tracing::info!(call = self.name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    permit.record_failure();

                    if attempt >= max_attempts {
                        tracing::warn!(
                            call = self.name,
                            attempts = attempt,
                            error = %e,
                            "Giving up after exhausting retries"
                        );
                        return Err(e);
                    }

                    tracing::debug!(
                        call = self.name,
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        self.policy.backoff
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }
    }
}
