//! Tracing subscriber setup
//!
//! Library crates only emit `tracing` events; binaries and tests call
//! [`init_tracing`] once to get them printed. The filter comes from
//! `RUST_LOG` and defaults to `info`.

use std::str::FromStr;

use bulwark_domain::BulwarkError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line human output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = BulwarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" | "pretty" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(BulwarkError::InvalidInput(format!("unknown log format: {other}"))),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter());

    let result = match format {
        LogFormat::Compact => {
            registry.with(tracing_subscriber::fmt::layer().compact().with_target(true)).try_init()
        }
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    result.is_ok()
}
