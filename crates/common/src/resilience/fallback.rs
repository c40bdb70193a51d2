//! Fallback execution.
//!
//! The primary operation runs first. When it fails with an eligible error the
//! configured fallback producer is invoked instead. If the fallback fails too,
//! the *primary* error is returned and the fallback error is only logged.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use super::classify::{is_eligible, Classify, ErrorMatchers};

/// Boxed error produced by fallback functions.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Future returned by a fallback producer.
pub type FallbackFuture<T> = BoxFuture<'static, Result<T, BoxedError>>;

type FallbackFn<T> = Arc<dyn Fn() -> FallbackFuture<T> + Send + Sync>;

/// Substitute computation plus its eligibility filter.
pub struct FallbackConfig<T> {
    fallback_function: FallbackFn<T>,
    /// Matchers selecting eligible errors; `None` makes every error eligible.
    pub fallback_on_errors: Option<ErrorMatchers>,
}

impl<T> Clone for FallbackConfig<T> {
    fn clone(&self) -> Self {
        Self {
            fallback_function: Arc::clone(&self.fallback_function),
            fallback_on_errors: self.fallback_on_errors.clone(),
        }
    }
}

impl<T> fmt::Debug for FallbackConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("fallback_on_errors", &self.fallback_on_errors)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> FallbackConfig<T> {
    /// Fallback driven by an async producer.
    pub fn new<F, Fut, FE>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FE>> + Send + 'static,
        FE: Into<BoxedError>,
    {
        let fallback_function: FallbackFn<T> = Arc::new(move || -> FallbackFuture<T> {
            let fut = producer();
            Box::pin(async move { fut.await.map_err(Into::into) })
        });
        Self { fallback_function, fallback_on_errors: None }
    }

    /// Fallback that always yields a clone of `value`.
    pub fn from_value(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move || {
            let value = value.clone();
            async move { Ok::<_, BoxedError>(value) }
        })
    }

    /// Restrict the fallback to errors hit by `matchers`.
    pub fn on_errors<I, S>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_on_errors = Some(ErrorMatchers::new(matchers));
        self
    }
}

impl<T> FallbackConfig<T> {
    /// Whether `error` allows the fallback to run.
    pub fn is_eligible<E: Classify + ?Sized>(&self, error: &E) -> bool {
        is_eligible(self.fallback_on_errors.as_ref(), error)
    }

    fn produce(&self) -> FallbackFuture<T> {
        (self.fallback_function)()
    }
}

/// Runs a primary operation with a fallback substitute.
#[derive(Debug)]
pub struct FallbackExecutor<T> {
    config: FallbackConfig<T>,
}

impl<T> FallbackExecutor<T> {
    /// Executor for `config`.
    pub fn new(config: FallbackConfig<T>) -> Self {
        Self { config }
    }

    /// The fallback configuration.
    pub fn config(&self) -> &FallbackConfig<T> {
        &self.config
    }

    /// Run `primary`, falling back on eligible failures.
    pub async fn execute<F, Fut, E>(&self, primary: F, operation_name: &str) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let primary_error = match primary().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !self.config.is_eligible(&primary_error) {
            debug!(
                target: "bulwark::fallback",
                operation = operation_name,
                error = %primary_error,
                "error not eligible for fallback"
            );
            return Err(primary_error);
        }

        warn!(
            target: "bulwark::fallback",
            operation = operation_name,
            error = %primary_error,
            "primary operation failed, invoking fallback"
        );

        match self.config.produce().await {
            Ok(value) => {
                info!(
                    target: "bulwark::fallback",
                    operation = operation_name,
                    "fallback succeeded"
                );
                Ok(value)
            }
            Err(fallback_error) => {
                error!(
                    target: "bulwark::fallback",
                    operation = operation_name,
                    primary_error = %primary_error,
                    fallback_error = %fallback_error,
                    "fallback failed, surfacing primary error"
                );
                Err(primary_error)
            }
        }
    }
}
