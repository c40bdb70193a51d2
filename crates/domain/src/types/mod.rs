//! Alerting domain types

pub mod alert;
pub mod channel;
pub mod failure;
pub mod stats;

pub use alert::{Alert, AlertLevel, Metadata};
pub use channel::{AlertChannelConfig, ChannelType};
pub use failure::{CriticalFailure, FailureSeverity};
pub use stats::{
    AlertStatistics, ChannelStatus, CriticalAlertPattern, DispatchOutcome, HealthReport,
    HealthStatus, PatternSeverity,
};
