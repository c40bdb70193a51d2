//! Failure recovery primitives.
//!
//! - [`retry`]: bounded retries with exponential backoff and error
//!   classification.
//! - [`circuit_breaker`]: per-resource CLOSED / OPEN / HALF_OPEN gate.
//! - [`fallback`]: substitute computation for eligible failures.
//! - [`orchestrator`]: composes the three per call and owns the named breaker
//!   registry.
//!
//! Retry and fallback eligibility are both decided by the classifier in
//! [`classify`]. Breakers read time through [`Clock`] so tests can drive
//! reset timeouts with [`MockClock`].

pub mod circuit_breaker;
pub mod classify;
pub mod clock;
pub mod fallback;
pub mod orchestrator;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerSnapshot,
    CircuitState, ConfigError, ConfigResult, ResilienceError, ResilienceResult, CIRCUIT_OPEN_CODE,
    HALF_OPEN_SUCCESS_THRESHOLD,
};
pub use classify::{is_eligible, Classify, ErrorMatchers, OperationError};
pub use clock::{Clock, MockClock, SystemClock};
pub use fallback::{BoxedError, FallbackConfig, FallbackExecutor, FallbackFuture};
pub use orchestrator::{
    CircuitBreakerOptions, FailureObserver, RecoveryFailure, RecoveryOptions, RecoveryOrchestrator,
};
pub use retry::{
    RetryConfig, RetryConfigBuilder, RetryExecutor, RetryOutcome, DEFAULT_RETRYABLE_ERRORS,
};
