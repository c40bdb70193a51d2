//! Wiring of the recovery and alerting components from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::{
    CircuitBreakerConfig, ConfigError, RecoveryOrchestrator, RetryConfig,
};
use bulwark_core::{AlertDispatcher, AlertingFailureObserver};
use bulwark_domain::{
    AlertingConfig, BulwarkError, CircuitBreakerSettings, Config, RecoveryConfig, Result,
    RetrySettings,
};

use crate::channels::{ConsoleSink, EmailSink, FileSink, WebhookSink};
use crate::http::HttpClient;

/// Fully wired recovery and alerting components.
pub struct Bulwark {
    /// Shared recovery orchestrator.
    pub orchestrator: Arc<RecoveryOrchestrator>,
    /// Shared alert dispatcher.
    pub dispatcher: Arc<AlertDispatcher>,
}

fn config_error(err: ConfigError) -> BulwarkError {
    BulwarkError::Config(err.to_string())
}

/// Validated retry configuration from settings.
pub fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    let builder = RetryConfig::builder()
        .max_attempts(settings.max_attempts)
        .base_delay(Duration::from_millis(settings.base_delay_ms))
        .max_delay(Duration::from_millis(settings.max_delay_ms))
        .backoff_multiplier(settings.backoff_multiplier);

    // Without configured matchers the builder keeps the recovery layer's defaults.
    let builder = match &settings.retryable_errors {
        _ if settings.retries_all_errors() => builder.retry_all_errors(),
        Some(matchers) => builder.retryable_errors(matchers.iter().cloned()),
        None => builder,
    };

    builder.build().map_err(config_error)
}

/// Validated default breaker configuration from settings.
pub fn breaker_config(settings: &CircuitBreakerSettings) -> Result<CircuitBreakerConfig> {
    CircuitBreakerConfig::builder()
        .failure_threshold(settings.failure_threshold)
        .reset_timeout(Duration::from_millis(settings.reset_timeout_ms))
        .build()
        .map_err(config_error)
}

/// Dispatcher with the built-in channels and a sink for every channel type.
pub fn build_dispatcher(config: &AlertingConfig) -> Result<AlertDispatcher> {
    let webhook_client = HttpClient::new()?;

    Ok(AlertDispatcher::new(config)
        .with_sink(Arc::new(ConsoleSink::new()))
        .with_sink(Arc::new(FileSink::new()))
        .with_sink(Arc::new(WebhookSink::new(webhook_client)))
        .with_sink(Arc::new(EmailSink::new())))
}

/// Orchestrator using the configured defaults. With a dispatcher, final
/// recovery failures are reported to it as critical failures.
pub fn build_orchestrator(
    config: &RecoveryConfig,
    dispatcher: Option<Arc<AlertDispatcher>>,
) -> Result<RecoveryOrchestrator> {
    let orchestrator = RecoveryOrchestrator::new(
        retry_config(&config.retry)?,
        breaker_config(&config.circuit_breaker)?,
    );

    Ok(match dispatcher {
        Some(dispatcher) => {
            orchestrator.with_observer(Arc::new(AlertingFailureObserver::new(dispatcher)))
        }
        None => orchestrator,
    })
}

/// Both components, with recovery failures routed into alerting.
pub fn build(config: &Config) -> Result<Bulwark> {
    let dispatcher = Arc::new(build_dispatcher(&config.alerting)?);
    let orchestrator = build_orchestrator(&config.recovery, Some(Arc::clone(&dispatcher)))?;

    tracing::info!(
        channels = dispatcher.channels().len(),
        rules = dispatcher.rules().len(),
        "bulwark components initialised"
    );

    Ok(Bulwark { orchestrator: Arc::new(orchestrator), dispatcher })
}
