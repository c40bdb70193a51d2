//! Alerting constants
//!
//! Defaults and analytics thresholds shared by the dispatcher, the analytics
//! and the configuration defaults.

// Channel names
/// Built-in console channel.
pub const CONSOLE_CHANNEL: &str = "console";
/// Built-in file channel.
pub const FILE_CHANNEL: &str = "file";
/// Built-in file channel that only accepts critical alerts.
pub const CRITICAL_FILE_CHANNEL: &str = "critical-file";
/// Built-in webhook channel.
pub const WEBHOOK_CHANNEL: &str = "webhook";
/// Built-in email channel.
pub const EMAIL_CHANNEL: &str = "email";

// Sink defaults
/// Log path of the `file` channel.
pub const DEFAULT_ALERTS_LOG_PATH: &str = "./logs/alerts.log";
/// Log path of the `critical-file` channel.
pub const DEFAULT_CRITICAL_ALERTS_LOG_PATH: &str = "./logs/critical-alerts.log";
/// Default alert cooldown.
pub const DEFAULT_GLOBAL_COOLDOWN_SECS: u64 = 300;
/// Default webhook request timeout.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Retryable-error matcher meaning "retry every error".
pub const RETRY_ALL_ERRORS: &str = "*";

/// Service label used in alert keys when an alert names no service.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Prefix of alerts synthesised from critical failures.
pub const CRITICAL_FAILURE_PREFIX: &str = "CRITICAL FAILURE:";

// Critical pattern detection
/// Recency window for critical pattern detection.
pub const CRITICAL_PATTERN_WINDOW_SECS: u64 = 5 * 60;
/// Occurrences at which a recent alert key is flagged `high`.
pub const HIGH_PATTERN_MIN_OCCURRENCES: u64 = 6;
/// Occurrences above which a recent alert key is flagged `critical`.
pub const CRITICAL_PATTERN_OCCURRENCES: u64 = 10;

// Health thresholds
/// Window for recent alert volume.
pub const RECENT_VOLUME_WINDOW_SECS: u64 = 60 * 60;
/// Recent alert volume above which alerting is degraded.
pub const HIGH_RECENT_VOLUME: u64 = 50;
