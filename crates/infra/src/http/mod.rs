//! HTTP client used by outbound delivery adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
