//! Port interfaces for alert delivery

use async_trait::async_trait;
use bulwark_domain::{Alert, AlertChannelConfig, ChannelType, Result};

/// Delivery capability for one kind of channel
///
/// The dispatcher selects a sink by the channel's [`ChannelType`] and hands
/// it the channel configuration, so a single sink serves every channel of
/// its type.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Channel type this sink delivers to
    fn channel_type(&self) -> ChannelType;

    /// Deliver one alert to one channel
    async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()>;
}
