//! Alerting statistics and health report types
//!
//! Everything here is a read-only snapshot produced by the dispatcher:
//! - Dispatch outcomes for a single alert
//! - Critical alert patterns derived from occurrence counts
//! - Channel status and overall alerting health

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::AlertLevel;
use super::channel::ChannelType;
use crate::impl_wire_name_conversions;

/* -------------------------------------------------------------------------- */
/* Dispatch */
/* -------------------------------------------------------------------------- */

/// What happened to one processed alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Alerting is switched off globally.
    Disabled,
    /// A duplicate inside the cooldown window; nothing was evaluated.
    Suppressed,
    /// Every channel in `attempted` was tried; `failed` lists the ones whose
    /// delivery failed.
    Dispatched { attempted: Vec<String>, failed: Vec<String> },
}

impl DispatchOutcome {
    /// Whether the alert was dropped by the cooldown.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    /// Channels attempted, empty unless dispatched.
    pub fn attempted(&self) -> &[String] {
        match self {
            Self::Dispatched { attempted, .. } => attempted,
            _ => &[],
        }
    }

    /// Channels whose delivery failed.
    pub fn failed(&self) -> &[String] {
        match self {
            Self::Dispatched { failed, .. } => failed,
            _ => &[],
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Critical Patterns */
/* -------------------------------------------------------------------------- */

/// How strongly an alert key is recurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    /// At least six recent occurrences.
    High,
    /// More than ten recent occurrences.
    Critical,
}

impl_wire_name_conversions!(PatternSeverity {
    High => "high",
    Critical => "critical",
});

/// An alert key that keeps recurring within the recent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalAlertPattern {
    /// Alert key, `service:message`.
    pub alert_key: String,
    /// Occurrences so far.
    pub occurrences: u64,
    /// Latest occurrence.
    pub last_occurrence: DateTime<Utc>,
    /// Flag derived from the occurrence count.
    pub severity: PatternSeverity,
}

/* -------------------------------------------------------------------------- */
/* Channels and Health */
/* -------------------------------------------------------------------------- */

/// Configuration summary of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    /// Channel name.
    pub name: String,
    /// Sink type.
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Whether the channel is enabled.
    pub enabled: bool,
    /// Accepted levels.
    pub levels: Vec<AlertLevel>,
}

/// Overall alerting health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No issues.
    Healthy,
    /// Alerts still flow but something needs attention.
    Degraded,
    /// No channel can deliver.
    Unhealthy,
}

impl_wire_name_conversions!(HealthStatus {
    Healthy => "healthy",
    Degraded => "degraded",
    Unhealthy => "unhealthy",
});

/// Health verdict with the human-readable reasons behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst verdict reached.
    pub status: HealthStatus,
    /// Reasons for the verdict.
    pub issues: Vec<String>,
}

impl HealthReport {
    /// Healthy report with no issues.
    pub fn healthy() -> Self {
        Self { status: HealthStatus::Healthy, issues: Vec::new() }
    }

    /// Record an issue, escalating to `status` unless a worse verdict is
    /// already in place.
    pub fn escalate(&mut self, status: HealthStatus, issue: impl Into<String>) {
        self.status = self.status.max(status);
        self.issues.push(issue.into());
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::healthy()
    }
}

/* -------------------------------------------------------------------------- */
/* Aggregate */
/* -------------------------------------------------------------------------- */

/// Aggregate view returned by the dispatcher's statistics query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// Alerts that passed the cooldown check and were routed.
    pub total_processed: u64,
    /// Alerts dropped as duplicates within the cooldown window.
    pub suppressed: u64,
    /// Routed alerts per level.
    pub by_level: BTreeMap<AlertLevel, u64>,
    /// Routed alerts per service.
    pub by_service: BTreeMap<String, u64>,
    /// Alerts routed within the last hour.
    pub last_hour: u64,
    /// Distinct alert keys currently tracked.
    pub tracked_keys: usize,
    /// Configured channels.
    pub channels: Vec<ChannelStatus>,
    /// Health verdict.
    pub health: HealthReport,
    /// Recurring alert keys.
    pub critical_patterns: Vec<CriticalAlertPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhealthy_is_sticky_over_degraded() {
        let mut report = HealthReport::healthy();
        report.escalate(HealthStatus::Unhealthy, "no channels enabled");
        report.escalate(HealthStatus::Degraded, "high alert volume");

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_dispatch_outcome_accessors() {
        let outcome = DispatchOutcome::Dispatched {
            attempted: vec!["console".into(), "webhook".into()],
            failed: vec!["webhook".into()],
        };
        assert_eq!(outcome.attempted().len(), 2);
        assert_eq!(outcome.failed(), ["webhook".to_string()]);
        assert!(DispatchOutcome::Suppressed.attempted().is_empty());
        assert!(DispatchOutcome::Suppressed.is_suppressed());
    }

    #[test]
    fn test_statistics_serialize_level_keys_lowercase() {
        let mut by_level = BTreeMap::new();
        by_level.insert(AlertLevel::Critical, 2);
        let stats = AlertStatistics {
            total_processed: 2,
            suppressed: 0,
            by_level,
            by_service: BTreeMap::new(),
            last_hour: 2,
            tracked_keys: 1,
            channels: Vec::new(),
            health: HealthReport::healthy(),
            critical_patterns: Vec::new(),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_level"]["critical"], 2);
        assert_eq!(json["health"]["status"], "healthy");
    }
}
