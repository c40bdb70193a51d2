//! # Bulwark Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Alert delivery sinks (console, file, webhook, email)
//! - The outbound HTTP client
//! - Configuration loading (environment and JSON/TOML files)
//! - Tracing subscriber setup
//! - Bootstrap wiring of the orchestrator and dispatcher
//!
//! ## Architecture
//! - Implements traits defined in `bulwark-core`
//! - Contains all "impure" code (I/O, network, terminal)

pub mod bootstrap;
pub mod channels;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use bootstrap::{build, build_dispatcher, build_orchestrator, Bulwark};
pub use channels::*;
pub use errors::InfraError;
pub use http::*;
pub use observability::{init_tracing, LogFormat};
