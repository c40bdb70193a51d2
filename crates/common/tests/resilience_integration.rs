//! Integration tests for the resilience module
//!
//! Exercises the public API end to end: composed recovery, breaker recovery
//! over time and concurrent use of the breaker registry.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::{
    CircuitBreakerConfig, CircuitState, Classify, FallbackConfig, MockClock, OperationError,
    RecoveryOptions, RecoveryOrchestrator, ResilienceError, RetryConfig,
};

fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .base_delay(Duration::from_millis(100))
        .max_delay(Duration::from_millis(1_000))
        .build()
        .expect("valid retry config")
}

fn breaker(threshold: u64, reset_secs: u64) -> CircuitBreakerConfig {
    CircuitBreakerConfig::builder()
        .failure_threshold(threshold)
        .reset_timeout(Duration::from_secs(reset_secs))
        .build()
        .expect("valid breaker config")
}

async fn transcribe(
    orchestrator: &RecoveryOrchestrator<MockClock>,
    calls: &AtomicU32,
    healthy: &AtomicBool,
) -> Result<&'static str, ResilienceError<OperationError>> {
    orchestrator
        .execute_with_recovery(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                if healthy.load(Ordering::SeqCst) {
                    Ok("transcript")
                } else {
                    Err(OperationError::with_code("SERVICE_UNAVAILABLE", "503 from upstream"))
                }
            },
            "speech.transcribe",
            RecoveryOptions::new().circuit_breaker_with("speech", breaker(2, 30)),
        )
        .await
}

/// A breaker that trips during one retried call keeps rejecting subsequent
/// calls until its reset timeout elapses, then recovers after three
/// successful trial calls.
#[tokio::test(start_paused = true)]
async fn test_breaker_trips_and_recovers_across_calls() {
    let clock = MockClock::new();
    let orchestrator =
        RecoveryOrchestrator::with_clock(retry(3), CircuitBreakerConfig::default(), clock.clone());
    let calls = AtomicU32::new(0);
    let healthy = AtomicBool::new(false);

    let first = transcribe(&orchestrator, &calls, &healthy).await;
    assert!(matches!(first, Err(ResilienceError::CircuitOpen { ref name }) if name == "speech"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let second = transcribe(&orchestrator, &calls, &healthy).await;
    assert!(second.unwrap_err().is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 2, "open breaker must not invoke the operation");

    healthy.store(true, Ordering::SeqCst);
    clock.advance(Duration::from_secs(30));

    for _ in 0..2 {
        assert_eq!(transcribe(&orchestrator, &calls, &healthy).await.unwrap(), "transcript");
        assert_eq!(
            orchestrator.get_circuit_breaker_state("speech").unwrap().state,
            CircuitState::HalfOpen
        );
    }
    assert_eq!(transcribe(&orchestrator, &calls, &healthy).await.unwrap(), "transcript");

    let snapshot = orchestrator.get_circuit_breaker_state("speech").unwrap();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 0);
}

/// Fallback output stands in for a failing primary while the breaker keeps
/// counting the primary's failures.
#[tokio::test(start_paused = true)]
async fn test_fallback_masks_failures_but_breaker_still_counts_them() {
    let orchestrator = RecoveryOrchestrator::with_clock(
        retry(3),
        CircuitBreakerConfig::default(),
        MockClock::new(),
    );

    for _ in 0..3 {
        let result = orchestrator
            .execute_with_recovery(
                || async {
                    Err::<String, _>(OperationError::with_code("ETIMEDOUT", "export timed out"))
                },
                "docs.export",
                RecoveryOptions::new().circuit_breaker_with("export", breaker(3, 60)).fallback(
                    FallbackConfig::from_value("queued".to_string()).on_errors(["TIMEOUT"]),
                ),
            )
            .await;
        assert_eq!(result.unwrap(), "queued");
    }

    let snapshot = orchestrator.get_circuit_breaker_state("export").unwrap();
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.failure_count, 3);
}

/// Elapsed backoff over a fully exhausted call equals the capped exponential
/// series without a trailing delay.
#[tokio::test(start_paused = true)]
async fn test_exhausted_retry_elapses_expected_backoff() {
    let orchestrator = RecoveryOrchestrator::new(retry(5), CircuitBreakerConfig::default());
    let started = tokio::time::Instant::now();

    let result = orchestrator
        .execute_with_recovery(
            || async { Err::<(), _>(OperationError::with_code("ECONNREFUSED", "refused")) },
            "sop.generate",
            RecoveryOptions::new(),
        )
        .await;

    assert_eq!(result.unwrap_err().code(), Some("ECONNREFUSED"));
    // 100 + 200 + 400 + 800
    assert_eq!(started.elapsed(), Duration::from_millis(1_500));
}

/// Concurrent callers asking for the same breaker name share one instance.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registry_access_shares_one_breaker() {
    let orchestrator = Arc::new(RecoveryOrchestrator::default());
    let mut handles = Vec::new();

    for _ in 0..16 {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let breaker = orchestrator.circuit_breaker("shared", None).expect("breaker");
            breaker.record_failure();
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    let states = orchestrator.get_all_circuit_breaker_states();
    assert_eq!(states.len(), 1);
    assert_eq!(states["shared"].failure_count, 16);
}
