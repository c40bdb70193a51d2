//! Configuration management

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONSOLE_CHANNEL, CRITICAL_FILE_CHANNEL, DEFAULT_ALERTS_LOG_PATH,
    DEFAULT_CRITICAL_ALERTS_LOG_PATH, DEFAULT_GLOBAL_COOLDOWN_SECS, EMAIL_CHANNEL, FILE_CHANNEL,
    RETRY_ALL_ERRORS, WEBHOOK_CHANNEL,
};
use crate::types::{AlertChannelConfig, AlertLevel};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retry and circuit breaker defaults.
    pub recovery: RecoveryConfig,
    /// Alert routing and channel settings.
    pub alerting: AlertingConfig,
}

/// Recovery layer defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Default retry behaviour.
    pub retry: RetrySettings,
    /// Thresholds for breakers created without their own.
    pub circuit_breaker: CircuitBreakerSettings,
}

/// Default retry behaviour, overridable per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each attempt.
    pub backoff_multiplier: f64,
    /// Matchers for retryable errors. `None` keeps the recovery layer's
    /// default matchers; a [`RETRY_ALL_ERRORS`] entry retries everything.
    pub retryable_errors: Option<Vec<String>>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            retryable_errors: None,
        }
    }
}

impl RetrySettings {
    /// Whether the matchers ask for every error to be retried.
    pub fn retries_all_errors(&self) -> bool {
        self.retryable_errors
            .as_ref()
            .is_some_and(|matchers| matchers.iter().any(|m| m.trim() == RETRY_ALL_ERRORS))
    }
}

/// Thresholds applied to breakers created without explicit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open a circuit.
    pub failure_threshold: u64,
    /// Time an open circuit waits before a trial call.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self { failure_threshold: 5, reset_timeout_ms: 60_000 }
    }
}

/// Alert dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Master switch; disabled dispatchers drop every alert.
    pub enabled: bool,
    /// Whether duplicate alerts are suppressed.
    pub cooldown_enabled: bool,
    /// Window in which an alert key is delivered at most once.
    pub global_cooldown_secs: u64,
    /// Channels used when no rule matches an alert.
    pub default_channels: Vec<String>,
    /// NDJSON log written by the `file` channel.
    pub alerts_log_path: String,
    /// NDJSON log written by the `critical-file` channel.
    pub critical_alerts_log_path: String,
    /// Target of the `webhook` channel; unset keeps it disabled.
    pub webhook_url: Option<String>,
    /// Extra headers sent with webhook requests.
    pub webhook_headers: BTreeMap<String, String>,
    /// Recipients of the `email` channel.
    pub email_recipients: Vec<String>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_enabled: true,
            global_cooldown_secs: DEFAULT_GLOBAL_COOLDOWN_SECS,
            default_channels: vec![CONSOLE_CHANNEL.to_string(), FILE_CHANNEL.to_string()],
            alerts_log_path: DEFAULT_ALERTS_LOG_PATH.to_string(),
            critical_alerts_log_path: DEFAULT_CRITICAL_ALERTS_LOG_PATH.to_string(),
            webhook_url: None,
            webhook_headers: BTreeMap::new(),
            email_recipients: Vec::new(),
        }
    }
}

impl AlertingConfig {
    /// The built-in channel set derived from this configuration.
    ///
    /// `webhook` is only enabled when a URL is configured and `email` only
    /// when recipients are, so routing rules may always name them.
    pub fn default_channel_configs(&self) -> Vec<AlertChannelConfig> {
        let headers: serde_json::Map<String, serde_json::Value> = self
            .webhook_headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        vec![
            AlertChannelConfig::console(CONSOLE_CHANNEL),
            AlertChannelConfig::file(FILE_CHANNEL, self.alerts_log_path.clone()),
            AlertChannelConfig::file(CRITICAL_FILE_CHANNEL, self.critical_alerts_log_path.clone())
                .with_levels([AlertLevel::Critical]),
            AlertChannelConfig::webhook(
                WEBHOOK_CHANNEL,
                self.webhook_url.clone().unwrap_or_default(),
            )
                .with_setting("headers", headers)
                .with_levels([AlertLevel::Error, AlertLevel::Critical])
                .enabled(self.webhook_url.as_deref().is_some_and(|url| !url.is_empty())),
            AlertChannelConfig::email(EMAIL_CHANNEL, self.email_recipients.iter().cloned())
                .with_levels([AlertLevel::Critical])
                .enabled(!self.email_recipients.is_empty()),
        ]
    }
}
