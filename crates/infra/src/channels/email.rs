//! Email sink placeholder.
//!
//! Records the intended delivery (recipients and subject) and reports
//! `NotImplemented`, so email channels show up as failed in dispatch
//! outcomes instead of silently succeeding.

use async_trait::async_trait;
use bulwark_core::AlertSink;
use bulwark_domain::{Alert, AlertChannelConfig, BulwarkError, ChannelType, Result};
use tracing::info;

/// Email sink placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailSink;

impl EmailSink {
    /// Email sink.
    pub fn new() -> Self {
        Self
    }
}

/// Subject line an email for `alert` would carry.
pub fn subject(alert: &Alert) -> String {
    format!(
        "[{}] {}: {}",
        alert.level.as_str().to_uppercase(),
        alert.service_or_unknown(),
        alert.message
    )
}

#[async_trait]
impl AlertSink for EmailSink {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()> {
        let recipients = channel.setting_list("recipients");
        info!(
            target: "bulwark::alerting",
            channel = %channel.name,
            recipients = ?recipients,
            subject = %subject(alert),
            alert_id = %alert.id,
            "email delivery requested"
        );
        Err(BulwarkError::NotImplemented("email delivery".into()))
    }
}
