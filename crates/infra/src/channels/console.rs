//! Console sink: one coloured line per alert on standard output.

use std::io::Write;

use async_trait::async_trait;
use bulwark_core::AlertSink;
use bulwark_domain::{Alert, AlertChannelConfig, AlertLevel, BulwarkError, ChannelType, Result};
use colored::{ColoredString, Colorize};

use crate::errors::InfraError;

/// Writes one coloured line per alert to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Console sink.
    pub fn new() -> Self {
        Self
    }
}

fn level_label(level: AlertLevel) -> ColoredString {
    let label = format!("[{}]", level.as_str().to_uppercase());
    match level {
        AlertLevel::Info => label.cyan(),
        AlertLevel::Warning => label.yellow(),
        AlertLevel::Error => label.red(),
        AlertLevel::Critical => label.white().on_red().bold(),
    }
}

/// Render `alert` the way the console sink prints it.
pub fn format_alert(alert: &Alert) -> String {
    let mut line = format!(
        "{} {} {} {}",
        alert.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        level_label(alert.level),
        format!("({})", alert.service_or_unknown()).dimmed(),
        alert.message
    );
    if let Some(metadata) = alert.metadata.as_ref().filter(|m| !m.is_empty()) {
        if let Ok(json) = serde_json::to_string(metadata) {
            line.push(' ');
            line.push_str(&json.dimmed().to_string());
        }
    }
    line
}

#[async_trait]
impl AlertSink for ConsoleSink {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Console
    }

    async fn deliver(&self, alert: &Alert, _channel: &AlertChannelConfig) -> Result<()> {
        let line = format_alert(alert);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|e| BulwarkError::from(InfraError::from(e)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn formats_level_service_and_message() {
        plain();
        let alert = Alert::error("queue backed up")
            .with_service("export")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        assert_eq!(
            format_alert(&alert),
            "2024-05-01T12:00:00.000Z [ERROR] (export) queue backed up"
        );
    }

    #[test]
    fn appends_metadata_as_json() {
        plain();
        let alert = Alert::warning("slow").with_metadata("latency_ms", 812);
        let line = format_alert(&alert);
        assert!(line.contains("(unknown) slow"));
        assert!(line.ends_with(r#"{"latency_ms":812}"#));
    }

    #[tokio::test]
    async fn delivers_to_stdout() {
        let sink = ConsoleSink::new();
        let channel = AlertChannelConfig::console("console");
        let result = sink.deliver(&Alert::info("hello"), &channel).await;
        assert!(result.is_ok());
    }
}
