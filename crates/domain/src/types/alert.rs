//! Alert events and severity levels.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::UNKNOWN_SERVICE;
use crate::impl_wire_name_conversions;

/// Severity of an alert. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Informational.
    Info,
    /// Needs attention soon.
    Warning,
    /// Something failed.
    Error,
    /// Needs immediate action.
    Critical,
}

impl_wire_name_conversions!(AlertLevel {
    Info => "info",
    Warning => "warning",
    Error => "error",
    Critical => "critical",
});

impl AlertLevel {
    /// Every level, lowest first.
    pub const ALL: [AlertLevel; 4] =
        [AlertLevel::Info, AlertLevel::Warning, AlertLevel::Error, AlertLevel::Critical];
}

/// Free-form structured context attached to alerts.
pub type Metadata = BTreeMap<String, Value>;

/// An operational event worth surfacing.
///
/// Alerts are immutable once built; the builder-style `with_*` methods consume
/// and return the alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id (UUID v4).
    pub id: String,
    /// Severity.
    pub level: AlertLevel,
    /// Human-readable description.
    pub message: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Service the alert concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Whether the underlying condition has cleared.
    #[serde(default)]
    pub resolved: bool,
    /// Structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Alert {
    /// New unresolved alert stamped with a fresh id and the current time.
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            service: None,
            resolved: false,
            metadata: None,
        }
    }

    /// Info-level alert.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, message)
    }

    /// Warning-level alert.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, message)
    }

    /// Error-level alert.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, message)
    }

    /// Critical alert.
    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Critical, message)
    }

    /// Attribute the alert to `service`.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.get_or_insert_with(Metadata::new).insert(key.into(), value.into());
        self
    }

    /// Mark the alert resolved.
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    /// Service name, or `unknown` when the alert names none.
    pub fn service_or_unknown(&self) -> &str {
        self.service.as_deref().unwrap_or(UNKNOWN_SERVICE)
    }

    /// Deduplication key: `service:message`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.service_or_unknown(), self.message)
    }
}
