//! Serde adapters for configuration values.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` stored as whole milliseconds.
///
/// ```rust
/// use std::time::Duration;
///
/// use bulwark_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Backoff {
///     #[serde(with = "duration_millis")]
///     base_delay: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize as whole milliseconds.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize from whole milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Breaker {
        #[serde(with = "duration_millis")]
        reset_timeout: Duration,
        failure_threshold: u64,
    }

    #[test]
    fn test_serializes_as_millis() {
        let value = Breaker { reset_timeout: Duration::from_secs(60), failure_threshold: 5 };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"reset_timeout":60000,"failure_threshold":5}"#);
    }

    #[test]
    fn test_deserializes_from_millis() {
        let value: Breaker =
            serde_json::from_str(r#"{"reset_timeout":1500,"failure_threshold":2}"#).unwrap();
        assert_eq!(value.reset_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_sub_millisecond_precision_is_truncated() {
        let value = Breaker { reset_timeout: Duration::from_micros(2_999), failure_threshold: 1 };
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"reset_timeout\":2"));
    }

    #[test]
    fn test_rejects_non_numeric_values() {
        let result: Result<Breaker, _> =
            serde_json::from_str(r#"{"reset_timeout":"soon","failure_threshold":2}"#);
        assert!(result.is_err());
    }
}
