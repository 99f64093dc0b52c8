//! Resilience wrappers around a raw [`IndexerAdaptor`]: bounded retry with
//! exponential backoff and a circuit breaker that fails fast when the
//! backend is unhealthy. Same decorator shape as an exporter retry/
//! circuit-breaker pair, adapted to the bulk-indexer contract.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use relay_core::message::BulkItem;
use relay_core::{IndexerAdaptor, IndexerError, ItemOutcome};
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Retries a failing bulk call with exponential backoff before giving up.
/// Does not retry [`IndexerError::CountMismatch`] — a malformed response
/// won't fix itself on the next attempt.
pub struct RetryingAdaptor<A: IndexerAdaptor> {
    inner: A,
    config: RetryConfig,
}

impl<A: IndexerAdaptor> RetryingAdaptor<A> {
    pub fn new(inner: A, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn with_defaults(inner: A) -> Self {
        Self::new(inner, RetryConfig::default())
    }
}

impl<A: IndexerAdaptor> IndexerAdaptor for RetryingAdaptor<A> {
    async fn bulk(&self, items: Vec<BulkItem>) -> Result<Vec<ItemOutcome>, IndexerError> {
        let max_attempts = self.config.max_retries + 1;
        let mut last_err = None;

        for attempt in 0..max_attempts {
            let delay = self.config.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tracing::warn!(attempt, ?delay, "retrying bulk call after backoff");
                sleep(delay).await;
            }

            match self.inner.bulk(items.clone()).await {
                Ok(outcomes) => return Ok(outcomes),
                Err(e @ IndexerError::CountMismatch { .. }) => return Err(e),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or(IndexerError::BulkFailure {
            reason: "retries exhausted with no recorded error".to_string(),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct State {
    circuit: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
}

/// Fails fast once the backend has shown `failure_threshold` consecutive
/// failures, instead of piling up latency on every in-flight batch while
/// it's down. Reopens for a single probe request after `reset_timeout`.
pub struct CircuitBreakerAdaptor<A: IndexerAdaptor> {
    inner: A,
    config: CircuitBreakerConfig,
    state: Mutex<State>,
    times_opened: AtomicU32,
}

impl<A: IndexerAdaptor> CircuitBreakerAdaptor<A> {
    pub fn new(inner: A, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(State {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure: None,
            }),
            times_opened: AtomicU32::new(0),
        }
    }

    pub fn with_defaults(inner: A) -> Self {
        Self::new(inner, CircuitBreakerConfig::default())
    }

    pub fn times_opened(&self) -> u32 {
        self.times_opened.load(Ordering::Relaxed)
    }

    fn should_allow(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.circuit {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if state
                    .last_failure
                    .is_some_and(|t| t.elapsed() >= self.config.reset_timeout)
                {
                    state.circuit = CircuitState::HalfOpen;
                    state.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        match state.circuit {
            CircuitState::Closed => state.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.config.success_threshold {
                    state.circuit = CircuitState::Closed;
                    state.consecutive_failures = 0;
                }
            }
            CircuitState::Open => state.circuit = CircuitState::Closed,
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.last_failure = Some(Instant::now());
        state.consecutive_successes = 0;
        match state.circuit {
            CircuitState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    state.circuit = CircuitState::Open;
                    self.times_opened.fetch_add(1, Ordering::Relaxed);
                }
            }
            CircuitState::HalfOpen => {
                state.circuit = CircuitState::Open;
                self.times_opened.fetch_add(1, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }
}

impl<A: IndexerAdaptor> IndexerAdaptor for CircuitBreakerAdaptor<A> {
    async fn bulk(&self, items: Vec<BulkItem>) -> Result<Vec<ItemOutcome>, IndexerError> {
        if !self.should_allow() {
            return Err(IndexerError::BulkFailure {
                reason: "circuit breaker open: indexer unavailable".to_string(),
            });
        }
        match self.inner.bulk(items).await {
            Ok(outcomes) => {
                self.record_success();
                Ok(outcomes)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }
}
