//! Small helpers shared by the resilience configuration types.

pub mod serde;

pub use self::serde::duration_millis;
