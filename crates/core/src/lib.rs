//! # Bulwark Core
//!
//! Alerting logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Alert routing rules and the dispatcher
//! - Cooldown tracking and alert analytics
//! - The [`AlertSink`] port implemented by delivery adapters
//!
//! ## Architecture Principles
//! - Only depends on `bulwark-common` and `bulwark-domain`
//! - No file, HTTP or terminal code
//! - All delivery goes through traits

pub mod alerting;

pub use alerting::{
    AlertCondition, AlertDispatcher, AlertRule, AlertSink, AlertingFailureObserver, AllOf, AnyOf,
    LevelAtLeast, LevelIn, MessageContains, ServiceIs,
};
