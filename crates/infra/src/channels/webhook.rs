//! Webhook sink: POSTs `{alert, system}` as JSON to the channel's URL.

use async_trait::async_trait;
use bulwark_core::AlertSink;
use bulwark_domain::{Alert, AlertChannelConfig, BulwarkError, ChannelType, Result};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;

use crate::http::client::{header_map, HttpClient};

/// Process details sent next to every alert.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Package name.
    pub name: &'static str,
    /// Package version.
    pub version: &'static str,
    /// Host the alert was sent from.
    pub hostname: Option<String>,
    /// Sending process id.
    pub pid: u32,
    /// When the request was built.
    pub sent_at: DateTime<Utc>,
}

impl SystemInfo {
    fn current() -> Self {
        Self {
            name: "bulwark",
            version: env!("CARGO_PKG_VERSION"),
            hostname: std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()),
            pid: std::process::id(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    alert: &'a Alert,
    system: SystemInfo,
}

/// Posts alerts as JSON to the channel's `url`.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: HttpClient,
}

impl WebhookSink {
    /// Webhook sink sending through `client`.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Webhook
    }

    async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()> {
        let url = channel.setting_str("url").filter(|u| !u.is_empty()).ok_or_else(|| {
            BulwarkError::Config(format!("webhook channel '{}' has no url", channel.name))
        })?;
        let headers = header_map(&channel.setting_map("headers"))?;

        let envelope = Envelope { alert, system: SystemInfo::current() };
        let request = self.client.request(Method::POST, url).headers(headers).json(&envelope);
        let response = self.client.send(request).await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BulwarkError::Delivery(format!(
                "webhook '{}' responded with HTTP {}",
                channel.name,
                status.as_u16()
            )))
        }
    }
}
