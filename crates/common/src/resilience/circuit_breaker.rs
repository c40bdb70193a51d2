//! Named circuit breaker.
//!
//! State machine:
//! - `CLOSED`: calls pass through, failures are counted.
//! - `OPEN`: calls are rejected with [`ResilienceError::CircuitOpen`] without
//!   invoking the operation.
//! - `HALF_OPEN`: trial calls pass through to probe recovery.
//!
//! `CLOSED -> OPEN` when the failure count reaches `failure_threshold`.
//! `OPEN -> HALF_OPEN` once `reset_timeout` has elapsed since the last
//! failure; this is checked lazily when a call arrives, there is no timer.
//! `HALF_OPEN -> CLOSED` after [`HALF_OPEN_SUCCESS_THRESHOLD`] consecutive
//! successes, `HALF_OPEN -> OPEN` on any failure.
//!
//! All counters of one breaker live behind a single mutex that is never held
//! across an `.await`, so [`CircuitBreaker::get_state`] stays cheap while
//! operations are in flight.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::classify::Classify;
use super::clock::{Clock, SystemClock};

/// Consecutive half-open successes required to close the circuit again.
pub const HALF_OPEN_SUCCESS_THRESHOLD: u64 = 3;

/// Error code reported for circuit-open rejections.
pub const CIRCUIT_OPEN_CODE: &str = "CIRCUIT_OPEN";

/// Invalid resilience configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Rejected configuration with the reason.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result of building or validating a configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by circuit-breaker protected operations.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("Circuit breaker '{name}' is OPEN, rejecting call")]
    CircuitOpen { name: String },

    /// The underlying operation failed.
    #[error("{error}")]
    OperationFailed { error: E },

    /// A breaker or retry configuration was rejected.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> ResilienceError<E> {
    /// Wrap an operation error.
    pub fn operation(error: E) -> Self {
        Self::OperationFailed { error }
    }

    /// Whether the call was rejected by an open circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The wrapped operation error, if this is not a circuit-open rejection.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::OperationFailed { error } => Some(error),
            _ => None,
        }
    }

    /// Take the wrapped operation error, if any.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed { error } => Some(error),
            _ => None,
        }
    }
}

impl<E> From<ConfigError> for ResilienceError<E> {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { message } => Self::InvalidConfiguration { message },
        }
    }
}

impl<E: Classify> Classify for ResilienceError<E> {
    fn code(&self) -> Option<&str> {
        match self {
            Self::CircuitOpen { .. } => Some(CIRCUIT_OPEN_CODE),
            Self::OperationFailed { error } => error.code(),
            Self::InvalidConfiguration { .. } => Some("INVALID_CONFIGURATION"),
        }
    }
}

/// Result of a circuit-breaker protected call.
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through; failures are counted.
    Closed,
    /// Calls are rejected without being invoked.
    Open,
    /// Trial calls test whether the dependency recovered.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Thresholds for one circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failures that open the circuit.
    pub failure_threshold: u64,
    /// Time after the last failure before a trial call is allowed.
    #[serde(with = "crate::utils::serde::duration_millis")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, reset_timeout: Duration::from_secs(60) }
    }
}

impl CircuitBreakerConfig {
    /// Start a validating builder from the defaults.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    /// Builder seeded with the default thresholds.
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    /// Consecutive failures that open the circuit.
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Time an open circuit waits before admitting a trial call.
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Read-only view of a breaker for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    /// Registry name of the breaker.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures counted so far.
    pub failure_count: u64,
    /// Successful trial calls while half-open.
    pub success_count: u64,
    /// Wall-clock time of the most recent failure.
    pub last_failure_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u64,
    success_count: u64,
    last_failure_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            last_failure_time: None,
        }
    }
}

/// Circuit breaker guarding one named resource.
///
/// Clones share state, so a clone handed out by a registry observes and
/// affects the same counters.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerInner>>,
    clock: Arc<C>,
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("success_count", &inner.success_count)
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a breaker on the system clock.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a breaker on a custom clock.
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: C,
    ) -> ConfigResult<Self> {
        Self::with_shared_clock(name, config, Arc::new(clock))
    }

    pub(crate) fn with_shared_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<C>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let name: String = name.into();

        Ok(Self {
            name: Arc::from(name),
            config,
            inner: Arc::new(Mutex::new(BreakerInner::closed())),
            clock,
        })
    }

    /// Registry name of this breaker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thresholds this breaker was created with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Gate check performed before each call.
    ///
    /// Moves `OPEN` to `HALF_OPEN` when the reset timeout has elapsed.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| self.clock.now().saturating_duration_since(at));
                let timed_out = elapsed.map_or(true, |e| e >= self.config.reset_timeout);
                if timed_out {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    info!(
                        target: "bulwark::circuit_breaker",
                        breaker = %self.name,
                        "reset timeout elapsed, circuit HALF_OPEN"
                    );
                }
                timed_out
            }
        }
    }

    /// Run `operation` under circuit-breaker protection.
    ///
    /// `operation` is not called at all while the circuit is open.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(self.rejection());
        }
        self.execute_acquired(operation()).await
    }

    /// Await a call already admitted by [`try_acquire`](Self::try_acquire)
    /// and record its outcome.
    pub async fn execute_acquired<Fut, T, E>(&self, call: Fut) -> ResilienceResult<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match call.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(ResilienceError::operation(error))
            }
        }
    }

    /// Fast-fail error for a call refused by the gate.
    pub fn rejection<E>(&self) -> ResilienceError<E> {
        debug!(
            target: "bulwark::circuit_breaker",
            breaker = %self.name,
            "circuit OPEN, rejecting call"
        );
        ResilienceError::CircuitOpen { name: self.name.to_string() }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= HALF_OPEN_SUCCESS_THRESHOLD {
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                info!(
                    target: "bulwark::circuit_breaker",
                    breaker = %self.name,
                    "circuit CLOSED after {} successful trial calls",
                    HALF_OPEN_SUCCESS_THRESHOLD
                );
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure_at = Some(self.clock.now());
        inner.last_failure_time = Some(self.clock.utc_now());

        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                warn!(
                    target: "bulwark::circuit_breaker",
                    breaker = %self.name,
                    failure_count = inner.failure_count,
                    "circuit OPEN after reaching failure threshold"
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                warn!(
                    target: "bulwark::circuit_breaker",
                    breaker = %self.name,
                    "trial call failed, circuit OPEN again"
                );
            }
            _ => {}
        }
    }

    /// Current state without triggering lazy transitions.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Observability snapshot; never mutates the breaker.
    pub fn get_state(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            name: self.name.to_string(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
        }
    }

    /// Force the breaker back to `CLOSED` with zeroed counters.
    pub fn reset(&self) {
        *self.inner.lock() = BreakerInner::closed();
        info!(target: "bulwark::circuit_breaker", breaker = %self.name, "circuit manually reset");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::resilience::{MockClock, OperationError};

    fn breaker(threshold: u64, clock: &MockClock) -> CircuitBreaker<MockClock> {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(threshold)
            .reset_timeout(Duration::from_secs(30))
            .build()
            .expect("valid breaker config");
        CircuitBreaker::with_clock("svc", config, clock.clone()).expect("breaker")
    }

    async fn fail(cb: &CircuitBreaker<MockClock>, calls: &AtomicU32) -> bool {
        cb.execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(OperationError::new("boom"))
        })
        .await
        .is_err_and(|e| e.is_circuit_open())
    }

    async fn succeed(cb: &CircuitBreaker<MockClock>, calls: &AtomicU32) -> bool {
        cb.execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, OperationError>(())
        })
        .await
        .is_ok()
    }

    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    #[test]
    fn test_config_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
        assert!(CircuitBreakerConfig::builder().failure_threshold(0).build().is_err());
    }

    #[tokio::test]
    async fn test_opens_at_threshold_and_stops_invoking_operation() {
        let clock = MockClock::new();
        let cb = breaker(3, &clock);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            assert!(!fail(&cb, &calls).await);
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        for _ in 0..5 {
            assert!(fail(&cb, &calls).await, "open circuit must reject");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3, "operation invoked while OPEN");
    }

    #[tokio::test]
    async fn test_open_circuit_skips_closure_body() {
        let clock = MockClock::new();
        let cb = breaker(1, &clock);
        let calls = AtomicU32::new(0);

        assert!(!fail(&cb, &calls).await);
        let result = cb
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, OperationError>(()) }
            })
            .await;

        assert!(result.is_err_and(|e| e.is_circuit_open()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_acquired_records_outcome() {
        let clock = MockClock::new();
        let cb = breaker(1, &clock);

        assert!(cb.try_acquire());
        let result = cb.execute_acquired(async { Err::<(), _>(OperationError::new("boom")) }).await;
        assert!(!result.is_err_and(|e| e.is_circuit_open()));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.try_acquire());
    }

    #[tokio::test]
    async fn test_success_in_closed_resets_failure_count() {
        let clock = MockClock::new();
        let cb = breaker(3, &clock);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await;
        fail(&cb, &calls).await;
        assert_eq!(cb.get_state().failure_count, 2);

        succeed(&cb, &calls).await;
        let snapshot = cb.get_state();
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_after_reset_timeout_then_closes_after_three_successes() {
        let clock = MockClock::new();
        let cb = breaker(2, &clock);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await;
        fail(&cb, &calls).await;
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(29));
        assert!(!cb.try_acquire());
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(1));
        assert!(succeed(&cb, &calls).await);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert!(succeed(&cb, &calls).await);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(succeed(&cb, &calls).await);

        let snapshot = cb.get_state();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
    }

    #[tokio::test]
    async fn test_failure_in_half_open_reopens() {
        let clock = MockClock::new();
        let cb = breaker(1, &clock);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await;
        clock.advance(Duration::from_secs(31));
        assert!(succeed(&cb, &calls).await);
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(!fail(&cb, &calls).await);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(fail(&cb, &calls).await);
    }

    #[tokio::test]
    async fn test_reset_forces_closed() {
        let clock = MockClock::new();
        let cb = breaker(1, &clock);
        let calls = AtomicU32::new(0);

        fail(&cb, &calls).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.get_state().last_failure_time.is_some());

        cb.reset();
        let snapshot = cb.get_state();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.success_count, 0);
        assert_eq!(snapshot.last_failure_time, None);
        assert!(succeed(&cb, &calls).await);
    }

    #[test]
    fn test_get_state_does_not_transition() {
        let clock = MockClock::new();
        let cb = breaker(1, &clock);
        cb.record_failure();
        clock.advance(Duration::from_secs(120));

        assert_eq!(cb.get_state().state, CircuitState::Open);
        assert_eq!(cb.get_state().state, CircuitState::Open);
    }

    #[test]
    fn test_circuit_open_error_classification() {
        let err: ResilienceError<OperationError> =
            ResilienceError::CircuitOpen { name: "svc".into() };
        assert_eq!(err.code(), Some(CIRCUIT_OPEN_CODE));
        assert!(err.to_string().contains("svc"));

        let err = ResilienceError::operation(OperationError::with_code("TIMEOUT", "slow"));
        assert_eq!(err.code(), Some("TIMEOUT"));
        assert_eq!(err.to_string(), "slow");
    }

    #[tokio::test]
    async fn test_concurrent_access_is_consistent() {
        let cb = CircuitBreaker::new(
            "shared",
            CircuitBreakerConfig::builder().failure_threshold(1000).build().unwrap(),
        )
        .unwrap();
        let mut handles = Vec::new();

        for _ in 0..10 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                cb.record_failure();
                cb.get_state()
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.get_state().failure_count, 10);
    }
}
