//! Count-based circuit breaker guarding the rate provider.
//!
//! Closed: calls pass and their outcomes fill a sliding window. Once the
//! window is full and the failure rate reaches the threshold the breaker
//! opens. Open: calls are rejected until the open duration has elapsed.
//! Half-open: a fixed number of trial calls pass; if all succeed the breaker
//! closes, any failure re-opens it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use currency_types::RateError;

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Failure percentage (0-100] at or above which the breaker opens.
    pub failure_rate_threshold: f64,
    /// Number of most recent calls the failure rate is computed over.
    pub sliding_window_size: usize,
    /// How long the breaker stays open before allowing trial calls.
    pub open_duration: Duration,
    /// Trial calls permitted while half-open.
    pub half_open_calls: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 60.0,
            sliding_window_size: 5,
            open_duration: Duration::from_secs(30),
            half_open_calls: 2,
        }
    }
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Admission ticket returned by [`CircuitBreaker::try_acquire`].
///
/// Outcomes are only counted against the state the permit was issued in, so
/// a slow call admitted before a transition cannot skew the next phase. A
/// permit dropped without an outcome counts as a failure; otherwise an
/// abandoned half-open trial would hold its slot forever.
#[derive(Debug)]
#[must_use = "the call outcome must be recorded with the permit"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    recorded: bool,
}

impl CallPermit<'_> {
    pub fn record_success(mut self) {
        self.recorded = true;
        self.breaker.record(self.generation, false);
    }

    pub fn record_failure(mut self) {
        self.recorded = true;
        self.breaker.record(self.generation, true);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            tracing::debug!(
                breaker = self.breaker.name,
                "Call abandoned without an outcome, counting it as failed"
            );
            self.breaker.record(self.generation, true);
        }
    }
}

#[derive(Debug)]
enum Phase {
    /// `true` entries are failures.
    Closed { outcomes: VecDeque<bool> },
    Open { until: Instant },
    HalfOpen {
        issued: usize,
        successes: usize,
        failures: usize,
    },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    generation: u64,
}

impl Inner {
    fn transition(&mut self, phase: Phase) {
        self.phase = phase;
        self.generation += 1;
    }
}

/// Thread-safe circuit breaker. Share it behind an `Arc`.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed {
                    outcomes: VecDeque::with_capacity(config.sliding_window_size),
                },
                generation: 0,
            }),
        }
    }

    /// Current state. An open breaker whose duration has elapsed still
    /// reports `Open` until the next call moves it to half-open.
    pub fn state(&self) -> CircuitState {
        match self.lock().phase {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Asks permission for one call. Fails fast with
    /// [`RateError::CircuitOpen`] while open or when all half-open trials
    /// are already taken.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, RateError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let limit = self.config.half_open_calls;

        match inner.phase {
            Phase::Closed { .. } => {}
            Phase::Open { until } if Instant::now() < until => {
                return Err(RateError::CircuitOpen);
            }
            Phase::Open { .. } => {
                tracing::info!(breaker = self.name, "Circuit breaker half-open");
                inner.transition(Phase::HalfOpen {
                    issued: 1,
                    successes: 0,
                    failures: 0,
                });
            }
            Phase::HalfOpen { ref mut issued, .. } if *issued < limit => {
                *issued += 1;
            }
            Phase::HalfOpen { .. } => return Err(RateError::CircuitOpen),
        }

        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            recorded: false,
        })
    }

    fn record(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if generation != inner.generation {
            return;
        }

        let next = match &mut inner.phase {
            Phase::Closed { outcomes } => {
                outcomes.push_back(failed);
                if outcomes.len() > self.config.sliding_window_size {
                    outcomes.pop_front();
                }
                if outcomes.len() < self.config.sliding_window_size {
                    None
                } else {
                    let failures = outcomes.iter().filter(|failed| **failed).count();
                    let rate = failures as f64 * 100.0 / outcomes.len() as f64;
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            breaker = self.name,
                            failure_rate = rate,
                            "Circuit breaker opened"
                        );
                        Some(self.open_phase())
                    } else {
                        None
                    }
                }
            }
            // Permits are never issued while open.
            Phase::Open { .. } => None,
            Phase::HalfOpen {
                successes,
                failures,
                ..
            } => {
                if failed {
                    *failures += 1;
                } else {
                    *successes += 1;
                }

                if *successes + *failures < self.config.half_open_calls {
                    None
                } else if *failures == 0 {
                    tracing::info!(breaker = self.name, "Circuit breaker closed");
                    Some(Phase::Closed {
                        outcomes: VecDeque::with_capacity(self.config.sliding_window_size),
                    })
                } else {
                    tracing::warn!(
                        breaker = self.name,
                        failures = *failures,
                        "Circuit breaker re-opened after half-open trials"
                    );
                    Some(self.open_phase())
                }
            }
        };

        if let Some(phase) = next {
            inner.transition(phase);
        }
    }

    fn open_phase(&self) -> Phase {
        Phase::Open {
            until: Instant::now() + self.config.open_duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
