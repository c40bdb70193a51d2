//! Routing rules: a condition over an alert mapped to a set of channels.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bulwark_domain::constants::{
    CONSOLE_CHANNEL, CRITICAL_FILE_CHANNEL, EMAIL_CHANNEL, FILE_CHANNEL, WEBHOOK_CHANNEL,
};
use bulwark_domain::{Alert, AlertLevel};

/// Predicate deciding whether a rule applies to an alert.
///
/// Any `Fn(&Alert) -> bool` closure is a condition.
pub trait AlertCondition: Send + Sync {
    fn matches(&self, alert: &Alert) -> bool;
}

impl<F> AlertCondition for F
where
    F: Fn(&Alert) -> bool + Send + Sync,
{
    fn matches(&self, alert: &Alert) -> bool {
        self(alert)
    }
}

/// Alerts at `level` or more severe.
#[derive(Debug, Clone, Copy)]
pub struct LevelAtLeast(pub AlertLevel);

impl AlertCondition for LevelAtLeast {
    fn matches(&self, alert: &Alert) -> bool {
        alert.level >= self.0
    }
}

/// Alerts whose level is one of the given levels.
#[derive(Debug, Clone)]
pub struct LevelIn(pub BTreeSet<AlertLevel>);

impl LevelIn {
    /// Condition over the given levels.
    pub fn new(levels: impl IntoIterator<Item = AlertLevel>) -> Self {
        Self(levels.into_iter().collect())
    }
}

impl AlertCondition for LevelIn {
    fn matches(&self, alert: &Alert) -> bool {
        self.0.contains(&alert.level)
    }
}

/// Alerts raised by the named service.
#[derive(Debug, Clone)]
pub struct ServiceIs(pub String);

impl AlertCondition for ServiceIs {
    fn matches(&self, alert: &Alert) -> bool {
        alert.service.as_deref() == Some(self.0.as_str())
    }
}

/// Alerts whose message contains the needle, ignoring case.
#[derive(Debug, Clone)]
pub struct MessageContains(String);

impl MessageContains {
    /// Case-insensitive substring condition.
    pub fn new(needle: impl Into<String>) -> Self {
        Self(needle.into().to_lowercase())
    }
}

impl AlertCondition for MessageContains {
    fn matches(&self, alert: &Alert) -> bool {
        alert.message.to_lowercase().contains(&self.0)
    }
}

/// Matches when any inner condition matches.
#[derive(Clone, Default)]
pub struct AnyOf(pub Vec<Arc<dyn AlertCondition>>);

impl AnyOf {
    /// Add another alternative.
    pub fn or(mut self, condition: impl AlertCondition + 'static) -> Self {
        self.0.push(Arc::new(condition));
        self
    }
}

impl AlertCondition for AnyOf {
    fn matches(&self, alert: &Alert) -> bool {
        self.0.iter().any(|c| c.matches(alert))
    }
}

/// Matches when every inner condition matches.
#[derive(Clone, Default)]
pub struct AllOf(pub Vec<Arc<dyn AlertCondition>>);

impl AllOf {
    /// Add another requirement.
    pub fn and(mut self, condition: impl AlertCondition + 'static) -> Self {
        self.0.push(Arc::new(condition));
        self
    }
}

impl AlertCondition for AllOf {
    fn matches(&self, alert: &Alert) -> bool {
        self.0.iter().all(|c| c.matches(alert))
    }
}

/// Routes matching alerts to a list of channels.
#[derive(Clone)]
pub struct AlertRule {
    /// Unique rule id; adding a rule with an existing id replaces it.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    condition: Arc<dyn AlertCondition>,
    /// Target channel names, in order, without duplicates.
    pub channels: Vec<String>,
    /// Disabled rules never match.
    pub enabled: bool,
    /// Minimum gap between two firings of this rule for the same alert key.
    pub cooldown: Option<Duration>,
}

impl fmt::Debug for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field("enabled", &self.enabled)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl AlertRule {
    /// Enabled rule without a cooldown.
    pub fn new<I, S>(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: impl AlertCondition + 'static,
        channels: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for channel in channels {
            let channel = channel.into();
            if !unique.contains(&channel) {
                unique.push(channel);
            }
        }

        Self {
            id: id.into(),
            name: name.into(),
            condition: Arc::new(condition),
            channels: unique,
            enabled: true,
            cooldown: None,
        }
    }

    /// Mute the rule for `cooldown` after each firing per alert key.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Register the rule switched off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this rule is enabled and its condition holds for `alert`.
    pub fn matches(&self, alert: &Alert) -> bool {
        self.enabled && self.condition.matches(alert)
    }
}

/// Built-in routing: critical alerts everywhere, errors to the operational
/// channels. Lower levels fall through to the dispatcher's default channels.
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "critical-alerts",
            "Critical alerts",
            LevelIn::new([AlertLevel::Critical]),
            [CONSOLE_CHANNEL, FILE_CHANNEL, CRITICAL_FILE_CHANNEL, WEBHOOK_CHANNEL, EMAIL_CHANNEL],
        ),
        AlertRule::new(
            "error-alerts",
            "Error alerts",
            LevelIn::new([AlertLevel::Error]),
            [CONSOLE_CHANNEL, FILE_CHANNEL, WEBHOOK_CHANNEL],
        ),
    ]
}
