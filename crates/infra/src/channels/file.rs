//! File sink: appends one JSON record per alert (NDJSON).
//!
//! Appends to the same path are serialised through a per-path async lock and
//! each record goes out in a single write, so concurrent alerts never
//! interleave partial lines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bulwark_core::AlertSink;
use bulwark_domain::{Alert, AlertChannelConfig, BulwarkError, ChannelType, Result};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::errors::InfraError;

/// Appends alerts as NDJSON to the channel's `path`.
#[derive(Debug, Default)]
pub struct FileSink {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSink {
    /// File sink with no open paths.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(path.to_path_buf()).or_default())
    }

    async fn append(&self, path: &Path, record: &[u8]) -> std::result::Result<(), InfraError> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file =
            tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(record).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AlertSink for FileSink {
    fn channel_type(&self) -> ChannelType {
        ChannelType::File
    }

    async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()> {
        let path = channel.setting_str("path").filter(|p| !p.is_empty()).ok_or_else(|| {
            BulwarkError::Config(format!("file channel '{}' has no path", channel.name))
        })?;

        let mut record = serde_json::to_vec(alert).map_err(InfraError::from)?;
        record.push(b'\n');

        self.append(Path::new(path), &record).await.map_err(Into::into)
    }
}
