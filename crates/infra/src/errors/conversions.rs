//! Conversions from external infrastructure errors into domain errors.

use std::io::Error as IoError;

use bulwark_domain::BulwarkError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BulwarkError);

impl From<InfraError> for BulwarkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BulwarkError> for InfraError {
    fn from(value: BulwarkError) -> Self {
        InfraError(value)
    }
}

trait IntoBulwarkError {
    fn into_bulwark(self) -> BulwarkError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → BulwarkError */
/* -------------------------------------------------------------------------- */

impl IntoBulwarkError for IoError {
    fn into_bulwark(self) -> BulwarkError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => BulwarkError::NotFound(format!("path not found: {self}")),
            ErrorKind::PermissionDenied => BulwarkError::Io(format!("permission denied: {self}")),
            _ => BulwarkError::Io(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_bulwark())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → BulwarkError */
/* -------------------------------------------------------------------------- */

impl IntoBulwarkError for JsonError {
    fn into_bulwark(self) -> BulwarkError {
        BulwarkError::Serialization(format!(
            "json error at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_bulwark())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BulwarkError */
/* -------------------------------------------------------------------------- */

impl IntoBulwarkError for HttpError {
    fn into_bulwark(self) -> BulwarkError {
        if self.is_timeout() {
            return BulwarkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BulwarkError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return BulwarkError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => BulwarkError::NotFound(message),
                400..=499 => BulwarkError::Delivery(message),
                _ => BulwarkError::Network(message),
            };
        }

        BulwarkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bulwark())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
