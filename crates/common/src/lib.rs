//! Generic resilience building blocks shared across bulwark crates.
//!
//! Nothing in here knows about alerts or any other domain concept; the
//! alerting side lives in `bulwark-core` and only plugs in through
//! [`resilience::FailureObserver`].
//!
//! # Feature Tiers
//!
//! - `foundation`: serde helpers and error types, no async runtime
//! - `runtime`: retry, circuit breaker, fallback and the recovery orchestrator

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

#[cfg(feature = "runtime")]
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState, Classify, Clock,
    ErrorMatchers, FailureObserver, FallbackConfig, FallbackExecutor, MockClock, OperationError,
    RecoveryFailure, RecoveryOptions, RecoveryOrchestrator, ResilienceError, ResilienceResult,
    RetryConfig, RetryExecutor, RetryOutcome, SystemClock,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
