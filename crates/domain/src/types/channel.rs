//! Alert channel configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::alert::AlertLevel;
use crate::impl_wire_name_conversions;

/// Delivery sink kind. Selects which sink implementation handles a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Email delivery (placeholder).
    Email,
    /// HTTP POST of a JSON envelope.
    Webhook,
    /// Coloured line on stdout.
    Console,
    /// NDJSON append to a file.
    File,
}

impl_wire_name_conversions!(ChannelType {
    Email => "email",
    Webhook => "webhook",
    Console => "console",
    File => "file",
});

/// A named delivery channel.
///
/// `config` holds sink-specific settings (`path` for files, `url` and
/// `headers` for webhooks, `recipients` for email) and is opaque to the
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChannelConfig {
    /// Name rules and default channel lists refer to.
    pub name: String,
    /// Sink that delivers for this channel.
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Sink-specific settings.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Disabled channels are skipped.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Levels this channel accepts.
    pub levels: BTreeSet<AlertLevel>,
}

fn enabled_by_default() -> bool {
    true
}

impl AlertChannelConfig {
    /// Enabled channel accepting every level, with empty settings.
    pub fn new(name: impl Into<String>, channel_type: ChannelType) -> Self {
        Self {
            name: name.into(),
            channel_type,
            config: Map::new(),
            enabled: true,
            levels: AlertLevel::ALL.into_iter().collect(),
        }
    }

    /// Console channel.
    pub fn console(name: impl Into<String>) -> Self {
        Self::new(name, ChannelType::Console)
    }

    /// NDJSON file channel appending to `path`.
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, ChannelType::File).with_setting("path", path.into())
    }

    /// Webhook channel posting to `url`.
    pub fn webhook(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, ChannelType::Webhook).with_setting("url", url.into())
    }

    /// Email channel for `recipients`.
    pub fn email<I, S>(name: impl Into<String>, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recipients: Vec<Value> =
            recipients.into_iter().map(|r| Value::String(r.into())).collect();
        Self::new(name, ChannelType::Email).with_setting("recipients", recipients)
    }

    /// Restrict the accepted levels.
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = AlertLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Set one sink-specific setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Switch the channel on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the channel is enabled and accepts `level`.
    pub fn accepts(&self, level: AlertLevel) -> bool {
        self.enabled && self.levels.contains(&level)
    }

    /// A string setting, if present.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// A string-to-string map setting such as webhook headers. Non-string
    /// values are skipped.
    pub fn setting_map(&self, key: &str) -> Vec<(String, String)> {
        self.config
            .get(key)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A list-of-strings setting such as email recipients.
    pub fn setting_list(&self, key: &str) -> Vec<String> {
        self.config
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }
}
