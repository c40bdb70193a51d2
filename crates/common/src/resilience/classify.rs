//! Error classification shared by retry and fallback.
//!
//! Errors are classified by fuzzy string matching: a matcher hits when it is a
//! case-insensitive substring of the error code or of the upper-cased error
//! message. All matching goes through [`ErrorMatchers::matches`] so the
//! strategy can be replaced by structured error kinds without touching the
//! executors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error that can be classified by code and message.
///
/// The message is the `Display` rendering; `code` is an optional short
/// machine-readable tag such as `ETIMEDOUT` or `AUTH_ERROR`.
pub trait Classify: fmt::Display {
    /// Machine-readable error code, if the error carries one.
    fn code(&self) -> Option<&str> {
        None
    }
}

impl Classify for std::io::Error {}

impl Classify for String {}

impl Classify for &'static str {}

/// General purpose classifiable error for operations protected by the
/// recovery layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct OperationError {
    /// Optional error code used for classification.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl OperationError {
    /// Error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    /// Error with both a code and a message.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: message.into() }
    }
}

impl Classify for OperationError {
    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// A set of string matchers used to decide retry and fallback eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMatchers(Vec<String>);

impl ErrorMatchers {
    /// Build a matcher set. Matchers are stored upper-cased.
    pub fn new<I, S>(matchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(matchers.into_iter().map(|m| m.into().to_uppercase()).collect())
    }

    /// The configured matchers.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether no matcher is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `error` is hit by any matcher.
    pub fn matches<E: Classify + ?Sized>(&self, error: &E) -> bool {
        let code = error.code().map(str::to_uppercase);
        let message = error.to_string().to_uppercase();

        self.0.iter().any(|matcher| {
            code.as_deref().is_some_and(|code| code.contains(matcher.as_str()))
                || message.contains(matcher.as_str())
        })
    }
}

impl<S: Into<String>> FromIterator<S> for ErrorMatchers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Classify `error` against an optional matcher set.
///
/// An absent set means every error is eligible.
pub fn is_eligible<E: Classify + ?Sized>(matchers: Option<&ErrorMatchers>, error: &E) -> bool {
    matchers.map_or(true, |m| m.matches(error))
}
