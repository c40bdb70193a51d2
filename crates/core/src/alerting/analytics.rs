//! Derived views over tracked alerts: critical patterns and health.

use std::time::{Duration, Instant};

use bulwark_domain::constants::{
    CRITICAL_PATTERN_OCCURRENCES, CRITICAL_PATTERN_WINDOW_SECS, HIGH_PATTERN_MIN_OCCURRENCES,
    HIGH_RECENT_VOLUME,
};
use bulwark_domain::{
    AlertChannelConfig, CriticalAlertPattern, HealthReport, HealthStatus, PatternSeverity,
};

use super::tracker::TrackedAlert;

/// Alert keys recurring within the last five minutes, most frequent first.
///
/// At least six occurrences flag a key `high`, more than ten `critical`.
pub fn critical_patterns(entries: &[TrackedAlert], now: Instant) -> Vec<CriticalAlertPattern> {
    let window = Duration::from_secs(CRITICAL_PATTERN_WINDOW_SECS);

    let mut patterns: Vec<CriticalAlertPattern> = entries
        .iter()
        .filter(|entry| now.saturating_duration_since(entry.last_seen) <= window)
        .filter_map(|entry| {
            let severity = if entry.occurrences > CRITICAL_PATTERN_OCCURRENCES {
                PatternSeverity::Critical
            } else if entry.occurrences >= HIGH_PATTERN_MIN_OCCURRENCES {
                PatternSeverity::High
            } else {
                return None;
            };
            Some(CriticalAlertPattern {
                alert_key: entry.key.clone(),
                occurrences: entry.occurrences,
                last_occurrence: entry.last_occurrence,
                severity,
            })
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.occurrences.cmp(&a.occurrences).then_with(|| a.alert_key.cmp(&b.alert_key))
    });
    patterns
}

/// Health verdict for the alerting subsystem.
pub fn assess_health(
    channels: &[AlertChannelConfig],
    patterns: &[CriticalAlertPattern],
    recent_volume: u64,
) -> HealthReport {
    let mut report = HealthReport::healthy();
    let total = channels.len();
    let enabled = channels.iter().filter(|c| c.enabled).count();

    if enabled == 0 {
        report.escalate(HealthStatus::Unhealthy, "no alert channels are enabled");
    } else if enabled * 2 < total {
        report.escalate(
            HealthStatus::Degraded,
            format!("only {enabled} of {total} alert channels are enabled"),
        );
    }

    if !patterns.is_empty() {
        report.escalate(
            HealthStatus::Degraded,
            format!("{} critical alert pattern(s) detected", patterns.len()),
        );
    }

    if recent_volume > HIGH_RECENT_VOLUME {
        report.escalate(
            HealthStatus::Degraded,
            format!("high alert volume: {recent_volume} alerts in the last hour"),
        );
    }

    report
}
