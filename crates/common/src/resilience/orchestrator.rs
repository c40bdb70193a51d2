//! Composition of retry, fallback and circuit breaking per operation call.
//!
//! Layering, outer to inner: retry ⊃ fallback ⊃ circuit breaker ⊃ operation.
//! Every retry attempt re-checks the breaker gate; the fallback only runs once
//! the gated call failed; a fallback success ends the retry loop while a
//! fallback failure resurfaces the primary error, which may still be retried.
//!
//! Named breakers live in a registry owned by the orchestrator. They are
//! created lazily on first use and kept for the orchestrator's lifetime.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{error, info};

use super::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, ConfigResult, ResilienceError,
};
use super::classify::Classify;
use super::clock::{Clock, SystemClock};
use super::fallback::{FallbackConfig, FallbackExecutor};
use super::retry::{RetryConfig, RetryExecutor};

/// Which named breaker guards a call, optionally with its own thresholds.
#[derive(Debug, Clone)]
pub struct CircuitBreakerOptions {
    /// Registry name of the breaker.
    pub name: String,
    /// Thresholds used when the breaker is first created. Ignored for an
    /// already registered breaker.
    pub config: Option<CircuitBreakerConfig>,
}

/// Per-call selection of recovery layers.
pub struct RecoveryOptions<T> {
    /// Retry configuration replacing the orchestrator default.
    pub retry: Option<RetryConfig>,
    /// Breaker guarding each attempt.
    pub circuit_breaker: Option<CircuitBreakerOptions>,
    /// Substitute used when an attempt fails with an eligible error.
    pub fallback: Option<FallbackConfig<T>>,
}

impl<T> Default for RecoveryOptions<T> {
    fn default() -> Self {
        Self { retry: None, circuit_breaker: None, fallback: None }
    }
}

impl<T> fmt::Debug for RecoveryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryOptions")
            .field("retry", &self.retry)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl<T> RecoveryOptions<T> {
    /// No recovery layers beyond the orchestrator's default retry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the orchestrator's default retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Guard the call with the named breaker using default thresholds.
    pub fn circuit_breaker(mut self, name: impl Into<String>) -> Self {
        self.circuit_breaker = Some(CircuitBreakerOptions { name: name.into(), config: None });
        self
    }

    /// Guard the call with the named breaker and explicit thresholds.
    pub fn circuit_breaker_with(
        mut self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Self {
        self.circuit_breaker =
            Some(CircuitBreakerOptions { name: name.into(), config: Some(config) });
        self
    }

    /// Substitute a fallback value on eligible failures.
    pub fn fallback(mut self, config: FallbackConfig<T>) -> Self {
        self.fallback = Some(config);
        self
    }
}

/// Final failure of a recovery-protected call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryFailure {
    /// Name the operation was executed under.
    pub operation: String,
    /// Breaker guarding the call, if any.
    pub circuit_breaker: Option<String>,
    /// Whether the final error was a circuit-open rejection.
    pub circuit_open: bool,
    /// Classification code of the final error.
    pub error_code: Option<String>,
    /// Display form of the final error.
    pub error_message: String,
}

/// Notified when a recovery-protected operation fails for good.
#[async_trait]
pub trait FailureObserver: Send + Sync {
    async fn on_recovery_failure(&self, failure: RecoveryFailure);
}

/// Runs operations under composed recovery layers and owns the breaker
/// registry.
pub struct RecoveryOrchestrator<C: Clock = SystemClock> {
    retry: RetryExecutor,
    default_breaker_config: CircuitBreakerConfig,
    breakers: DashMap<String, CircuitBreaker<C>>,
    clock: Arc<C>,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl<C: Clock> fmt::Debug for RecoveryOrchestrator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryOrchestrator")
            .field("retry", &self.retry)
            .field("default_breaker_config", &self.default_breaker_config)
            .field("breakers", &self.breakers.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for RecoveryOrchestrator<SystemClock> {
    fn default() -> Self {
        Self::new(RetryConfig::default(), CircuitBreakerConfig::default())
    }
}

impl RecoveryOrchestrator<SystemClock> {
    /// Orchestrator on the system clock.
    pub fn new(retry: RetryConfig, default_breaker_config: CircuitBreakerConfig) -> Self {
        Self::with_clock(retry, default_breaker_config, SystemClock)
    }
}

impl<C: Clock> RecoveryOrchestrator<C> {
    /// Orchestrator whose breakers run on `clock`.
    pub fn with_clock(
        retry: RetryConfig,
        default_breaker_config: CircuitBreakerConfig,
        clock: C,
    ) -> Self {
        Self {
            retry: RetryExecutor::new(retry),
            default_breaker_config,
            breakers: DashMap::new(),
            clock: Arc::new(clock),
            observer: None,
        }
    }

    /// Attach an observer for final failures.
    pub fn with_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Shared handle to the named breaker, creating it on first use.
    pub fn circuit_breaker(
        &self,
        name: &str,
        config: Option<&CircuitBreakerConfig>,
    ) -> ConfigResult<CircuitBreaker<C>> {
        if let Some(existing) = self.breakers.get(name) {
            return Ok(existing.clone());
        }

        let entry = self.breakers.entry(name.to_string()).or_try_insert_with(|| {
            let config = config.unwrap_or(&self.default_breaker_config).clone();
            info!(
                target: "bulwark::circuit_breaker",
                breaker = name,
                "registering circuit breaker"
            );
            CircuitBreaker::with_shared_clock(name, config, Arc::clone(&self.clock))
        })?;
        Ok(entry.clone())
    }

    /// Run `operation` under the recovery layers selected by `options`.
    pub async fn execute_with_recovery<F, Fut, T, E>(
        &self,
        mut operation: F,
        operation_name: &str,
        options: RecoveryOptions<T>,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let breaker = match &options.circuit_breaker {
            Some(opts) => Some(self.circuit_breaker(&opts.name, opts.config.as_ref())?),
            None => None,
        };
        let fallback = options.fallback.map(FallbackExecutor::new);

        let result = self
            .retry
            .execute(
                || {
                    // The gate is checked before `operation` is called so an open
                    // circuit never runs any of the caller's work.
                    let admitted = match &breaker {
                        Some(breaker) if !breaker.try_acquire() => Err(breaker.rejection()),
                        _ => Ok(operation()),
                    };
                    let breaker = breaker.clone();
                    let fallback = fallback.as_ref();
                    async move {
                        let gated = async {
                            let attempt = match admitted {
                                Ok(attempt) => attempt,
                                Err(rejected) => return Err(rejected),
                            };
                            match &breaker {
                                Some(breaker) => breaker.execute_acquired(attempt).await,
                                None => attempt.await.map_err(ResilienceError::operation),
                            }
                        };
                        match fallback {
                            Some(fallback) => fallback.execute(move || gated, operation_name).await,
                            None => gated.await,
                        }
                    }
                },
                operation_name,
                options.retry.as_ref(),
            )
            .await;

        if let Err(err) = &result {
            error!(
                target: "bulwark::recovery",
                operation = operation_name,
                circuit_open = err.is_circuit_open(),
                error = %err,
                "operation failed after recovery"
            );
            if let Some(observer) = &self.observer {
                let failure = RecoveryFailure {
                    operation: operation_name.to_string(),
                    circuit_breaker: breaker.as_ref().map(|b| b.name().to_string()),
                    circuit_open: err.is_circuit_open(),
                    error_code: err.code().map(str::to_string),
                    error_message: err.to_string(),
                };
                observer.on_recovery_failure(failure).await;
            }
        }

        result
    }

    /// Snapshot of one named breaker, if registered.
    pub fn get_circuit_breaker_state(&self, name: &str) -> Option<CircuitBreakerSnapshot> {
        self.breakers.get(name).map(|breaker| breaker.get_state())
    }

    /// Snapshots of every registered breaker keyed by name.
    pub fn get_all_circuit_breaker_states(&self) -> BTreeMap<String, CircuitBreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().get_state()))
            .collect()
    }

    /// Force a registered breaker closed. Returns `false` for unknown names.
    pub fn reset_circuit_breaker(&self, name: &str) -> bool {
        match self.breakers.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }
}
