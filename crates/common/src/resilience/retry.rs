//! Retry with exponential backoff driven by error classification.
//!
//! An operation is attempted up to `max_attempts` times. After each failure
//! the error is classified against [`RetryConfig::retryable_errors`]:
//! non-retryable errors abort immediately, retryable ones wait
//! `min(base_delay * multiplier^(attempt - 1), max_delay)` before the next
//! attempt. No delay follows the final attempt.
//!
//! Every attempt outcome is emitted as a structured `tracing` event under the
//! `bulwark::retry` target (`operation`, `attempt`, `max_attempts`,
//! `delay_ms`, `retryable`, `error`) so telemetry can be built on top of it.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::circuit_breaker::{ConfigError, ConfigResult};
use super::classify::{is_eligible, Classify, ErrorMatchers};

/// Error codes treated as transient unless a caller overrides the set.
pub const DEFAULT_RETRYABLE_ERRORS: &[&str] = &[
    "ECONNRESET",
    "ETIMEDOUT",
    "ECONNREFUSED",
    "ENOTFOUND",
    "TIMEOUT",
    "SERVICE_UNAVAILABLE",
    "NETWORK_ERROR",
];

/// Retry behaviour for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    #[serde(rename = "base_delay_ms", with = "crate::utils::serde::duration_millis")]
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    #[serde(rename = "max_delay_ms", with = "crate::utils::serde::duration_millis")]
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Matchers for retryable errors. `None` retries every error.
    pub retryable_errors: Option<ErrorMatchers>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            retryable_errors: Some(ErrorMatchers::new(DEFAULT_RETRYABLE_ERRORS.iter().copied())),
        }
    }
}

impl RetryConfig {
    /// Start a validating builder from the defaults.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if !(self.backoff_multiplier >= 1.0) {
            return Err(ConfigError::Invalid {
                message: "backoff_multiplier must be at least 1.0".to_string(),
            });
        }

        if self.max_delay < self.base_delay {
            return Err(ConfigError::Invalid {
                message: "max_delay must not be smaller than base_delay".to_string(),
            });
        }

        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Whether `error` should be retried under this configuration.
    pub fn is_retryable<E: Classify + ?Sized>(&self, error: &E) -> bool {
        is_eligible(self.retryable_errors.as_ref(), error)
    }
}

/// Fluent builder for [`RetryConfig`].
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Builder seeded with the defaults.
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Total attempts, including the first.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Delay before the second attempt.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Upper bound for any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Factor applied to the delay after each attempt.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    /// Only retry errors hit by one of `matchers`.
    pub fn retryable_errors<I, S>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.retryable_errors = Some(ErrorMatchers::new(matchers));
        self
    }

    /// Retry every error regardless of classification.
    pub fn retry_all_errors(mut self) -> Self {
        self.config.retryable_errors = None;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Result of a retried execution together with attempt statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result of the last attempt.
    pub result: Result<T, E>,
    /// Number of attempts actually made.
    pub attempts: u32,
    /// Sum of all backoff delays slept.
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Drop the statistics and keep the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Runs operations under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Executor using `config` unless a call overrides it.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The default configuration used when no override is supplied.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute `operation` with retries, failing with the last observed error.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        operation_name: &str,
        config_override: Option<&RetryConfig>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.execute_with_outcome(operation, operation_name, config_override).await.into_result()
    }

    /// Execute `operation` with retries and report attempt statistics.
    #[instrument(skip_all, fields(operation = operation_name))]
    pub async fn execute_with_outcome<F, Fut, T, E>(
        &self,
        mut operation: F,
        operation_name: &str,
        config_override: Option<&RetryConfig>,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let config = config_override.unwrap_or(&self.config);
        let max_attempts = config.max_attempts.max(1);
        let mut attempt: u32 = 1;
        let mut total_delay = Duration::ZERO;

        loop {
            debug!(
                target: "bulwark::retry",
                operation = operation_name,
                attempt,
                max_attempts,
                "executing attempt"
            );

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            target: "bulwark::retry",
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            "operation succeeded after retry"
                        );
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(error) => error,
            };

            let retryable = config.is_retryable(&error);
            if !retryable {
                warn!(
                    target: "bulwark::retry",
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    retryable,
                    error = %error,
                    "non-retryable error, giving up"
                );
                return RetryOutcome { result: Err(error), attempts: attempt, total_delay };
            }

            if attempt >= max_attempts {
                warn!(
                    target: "bulwark::retry",
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    retryable,
                    error = %error,
                    "retry attempts exhausted"
                );
                return RetryOutcome { result: Err(error), attempts: attempt, total_delay };
            }

            let delay = config.delay_for_attempt(attempt);
            warn!(
                target: "bulwark::retry",
                operation = operation_name,
                attempt,
                max_attempts,
                retryable,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying after backoff"
            );

            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}
