//! Configuration loader
//!
//! Loads [`Config`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file if one is present
//! 2. If any `BULWARK_*` variable is set, builds the config from defaults
//!    plus those variables
//! 3. Otherwise probes the standard locations for a config file
//! 4. Falls back to [`Config::default`] when no file exists either
//!
//! ## Environment Variables
//! - `BULWARK_RETRY_MAX_ATTEMPTS`, `BULWARK_RETRY_BASE_DELAY_MS`,
//!   `BULWARK_RETRY_MAX_DELAY_MS`, `BULWARK_RETRY_BACKOFF_MULTIPLIER`
//! - `BULWARK_RETRYABLE_ERRORS`: comma-separated matchers, `*` retries all
//! - `BULWARK_BREAKER_FAILURE_THRESHOLD`, `BULWARK_BREAKER_RESET_TIMEOUT_MS`
//! - `BULWARK_ALERTING_ENABLED`, `BULWARK_ALERT_COOLDOWN_ENABLED`,
//!   `BULWARK_ALERT_COOLDOWN_SECS`
//! - `BULWARK_ALERT_DEFAULT_CHANNELS`: comma-separated channel names
//! - `BULWARK_ALERTS_LOG_PATH`, `BULWARK_CRITICAL_ALERTS_LOG_PATH`
//! - `BULWARK_WEBHOOK_URL`, `BULWARK_WEBHOOK_HEADERS` (`Name=value;Other=v`)
//! - `BULWARK_EMAIL_RECIPIENTS`: comma-separated addresses
//!
//! ## File Locations
//! `bulwark.{json,toml}` then `config.{json,toml}`, first in the working
//! directory and its two parents, then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bulwark_domain::{BulwarkError, Config, Result};

const ENV_PREFIX: &str = "BULWARK_";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `BulwarkError::Config` if a variable or the probed file is invalid.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Could not load .env file"),
    }

    if has_env_overrides() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No configuration found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// Unset variables keep their default values.
///
/// # Errors
/// Returns `BulwarkError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    let retry = &mut config.recovery.retry;
    apply_parsed("BULWARK_RETRY_MAX_ATTEMPTS", &mut retry.max_attempts)?;
    apply_parsed("BULWARK_RETRY_BASE_DELAY_MS", &mut retry.base_delay_ms)?;
    apply_parsed("BULWARK_RETRY_MAX_DELAY_MS", &mut retry.max_delay_ms)?;
    apply_parsed("BULWARK_RETRY_BACKOFF_MULTIPLIER", &mut retry.backoff_multiplier)?;
    if let Some(raw) = env_opt("BULWARK_RETRYABLE_ERRORS") {
        retry.retryable_errors = Some(split_list(&raw));
    }

    let breaker = &mut config.recovery.circuit_breaker;
    apply_parsed("BULWARK_BREAKER_FAILURE_THRESHOLD", &mut breaker.failure_threshold)?;
    apply_parsed("BULWARK_BREAKER_RESET_TIMEOUT_MS", &mut breaker.reset_timeout_ms)?;

    let alerting = &mut config.alerting;
    alerting.enabled = env_bool("BULWARK_ALERTING_ENABLED", alerting.enabled);
    alerting.cooldown_enabled =
        env_bool("BULWARK_ALERT_COOLDOWN_ENABLED", alerting.cooldown_enabled);
    apply_parsed("BULWARK_ALERT_COOLDOWN_SECS", &mut alerting.global_cooldown_secs)?;
    if let Some(raw) = env_opt("BULWARK_ALERT_DEFAULT_CHANNELS") {
        alerting.default_channels = split_list(&raw);
    }
    if let Some(path) = env_opt("BULWARK_ALERTS_LOG_PATH") {
        alerting.alerts_log_path = path;
    }
    if let Some(path) = env_opt("BULWARK_CRITICAL_ALERTS_LOG_PATH") {
        alerting.critical_alerts_log_path = path;
    }
    if let Some(url) = env_opt("BULWARK_WEBHOOK_URL") {
        alerting.webhook_url = Some(url);
    }
    if let Some(raw) = env_opt("BULWARK_WEBHOOK_HEADERS") {
        alerting.webhook_headers = parse_headers(&raw)?;
    }
    if let Some(raw) = env_opt("BULWARK_EMAIL_RECIPIENTS") {
        alerting.email_recipients = split_list(&raw);
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BulwarkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BulwarkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BulwarkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BulwarkError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration, format chosen by the extension of `path`.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BulwarkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BulwarkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BulwarkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for base in [dir.to_path_buf(), dir.join(".."), dir.join("../..")] {
        for name in ["bulwark.json", "bulwark.toml", "config.json", "config.toml"] {
            paths.push(base.join(name));
        }
    }
    paths
}

/// The first config file found in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn has_env_overrides() -> bool {
    std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn apply_parsed<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_opt(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| BulwarkError::Config(format!("Invalid value for {key}: {e}")))?;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_headers(raw: &str) -> Result<std::collections::BTreeMap<String, String>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    BulwarkError::Config(format!(
                        "Invalid header in BULWARK_WEBHOOK_HEADERS: {pair}"
                    ))
                })
        })
        .collect()
}
