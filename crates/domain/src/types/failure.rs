//! Critical failures reported by components, turned into alerts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::alert::{Alert, AlertLevel, Metadata};
use crate::constants::CRITICAL_FAILURE_PREFIX;
use crate::impl_wire_name_conversions;

/// How serious a reported failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureSeverity {
    /// Reported at `info`.
    Low,
    /// Reported at `warning`.
    Medium,
    /// Reported at `error`.
    High,
    /// Reported at `critical`.
    Critical,
}

impl_wire_name_conversions!(FailureSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl FailureSeverity {
    /// Alert level a failure of this severity is reported at.
    pub fn alert_level(self) -> AlertLevel {
        match self {
            FailureSeverity::Low => AlertLevel::Info,
            FailureSeverity::Medium => AlertLevel::Warning,
            FailureSeverity::High => AlertLevel::Error,
            FailureSeverity::Critical => AlertLevel::Critical,
        }
    }
}

/// A failure in some component, e.g. an exhausted recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalFailure {
    /// Kind of failure, e.g. `circuit_open`.
    #[serde(rename = "type")]
    pub failure_type: String,
    /// Component that failed.
    pub component: String,
    /// What went wrong.
    pub description: String,
    /// Severity, mapped to the alert level.
    pub severity: FailureSeverity,
    /// Structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl CriticalFailure {
    /// Failure without metadata.
    pub fn new(
        failure_type: impl Into<String>,
        component: impl Into<String>,
        description: impl Into<String>,
        severity: FailureSeverity,
    ) -> Self {
        Self {
            failure_type: failure_type.into(),
            component: component.into(),
            description: description.into(),
            severity,
            metadata: None,
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.get_or_insert_with(Metadata::new).insert(key.into(), value.into());
        self
    }

    /// Synthesise the alert for this failure.
    ///
    /// The component becomes the alert's service; type, component and
    /// severity are folded into the metadata next to any caller metadata.
    pub fn to_alert(&self) -> Alert {
        let message = format!(
            "{CRITICAL_FAILURE_PREFIX} {} in {}: {}",
            self.failure_type, self.component, self.description
        );
        let mut metadata = self.metadata.clone().unwrap_or_default();
        metadata.insert("failure_type".into(), Value::from(self.failure_type.clone()));
        metadata.insert("component".into(), Value::from(self.component.clone()));
        metadata.insert("severity".into(), Value::from(self.severity.as_str()));

        let mut alert =
            Alert::new(self.severity.alert_level(), message).with_service(self.component.clone());
        alert.metadata = Some(metadata);
        alert
    }
}
