//! # Bulwark Domain
//!
//! Alerting domain types for bulwark.
//!
//! This crate contains:
//! - Alerts, channels and critical failures
//! - Statistics and health report snapshots
//! - Configuration structures with their defaults
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other bulwark crates
//! - Only external dependencies allowed
//! - Pure data, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
