//! Alert dispatch domain

pub mod analytics;
pub mod dispatcher;
pub mod observer;
pub mod ports;
pub mod rules;
pub mod tracker;

pub use dispatcher::AlertDispatcher;
pub use observer::AlertingFailureObserver;
pub use ports::AlertSink;
pub use rules::*;
pub use tracker::{AlertTracker, TrackedAlert, TrackerSnapshot};
