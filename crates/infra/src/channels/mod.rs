//! Alert delivery adapters
//!
//! One [`AlertSink`](bulwark_core::AlertSink) per channel type. Each sink
//! reads its settings from the channel configuration it is handed, so a
//! single instance serves every channel of its type.

pub mod console;
pub mod email;
pub mod file;
pub mod webhook;

pub use console::ConsoleSink;
pub use email::EmailSink;
pub use file::FileSink;
pub use webhook::WebhookSink;
