//! Bridges final recovery failures into the alert pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use bulwark_common::resilience::{Clock, FailureObserver, RecoveryFailure, SystemClock};
use bulwark_domain::{CriticalFailure, FailureSeverity};
use serde_json::Value;

use super::dispatcher::AlertDispatcher;

/// Reports every exhausted recovery as a critical failure.
///
/// A call rejected by an open breaker is reported at `critical` severity,
/// any other exhausted call at `high`.
pub struct AlertingFailureObserver<C: Clock = SystemClock> {
    dispatcher: Arc<AlertDispatcher<C>>,
}

impl<C: Clock> AlertingFailureObserver<C> {
    /// Observer reporting into `dispatcher`.
    pub fn new(dispatcher: Arc<AlertDispatcher<C>>) -> Self {
        Self { dispatcher }
    }
}

fn to_critical_failure(failure: RecoveryFailure) -> CriticalFailure {
    let (failure_type, severity) = if failure.circuit_open {
        ("circuit_open", FailureSeverity::Critical)
    } else {
        ("recovery_exhausted", FailureSeverity::High)
    };
    let component = failure.circuit_breaker.clone().unwrap_or_else(|| failure.operation.clone());

    let mut critical =
        CriticalFailure::new(failure_type, component, failure.error_message, severity)
            .with_metadata("operation", failure.operation);
    if let Some(code) = failure.error_code {
        critical = critical.with_metadata("error_code", code);
    }
    if let Some(breaker) = failure.circuit_breaker {
        critical = critical.with_metadata("circuit_breaker", breaker);
    }
    critical.with_metadata("circuit_open", Value::Bool(failure.circuit_open))
}

#[async_trait]
impl<C: Clock> FailureObserver for AlertingFailureObserver<C> {
    async fn on_recovery_failure(&self, failure: RecoveryFailure) {
        self.dispatcher.process_critical_failure(to_critical_failure(failure)).await;
    }
}
