//! Display / FromStr for the small wire-named enums of the alerting domain.
//!
//! ```rust
//! use bulwark_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Verdict {
//!     Pass,
//!     Fail,
//! }
//!
//! impl_wire_name_conversions!(Verdict {
//!     Pass => "pass",
//!     Fail => "fail",
//! });
//!
//! assert_eq!("FAIL".parse::<Verdict>().unwrap(), Verdict::Fail);
//! ```

/// Implements `Display` (wire name) and case-insensitive `FromStr` for an enum.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::errors::BulwarkError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err($crate::errors::BulwarkError::InvalidInput(format!(
                        "invalid {}: {}",
                        stringify!($enum_name),
                        s
                    ))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::errors::BulwarkError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tier {
        Bronze,
        Gold,
    }

    impl_wire_name_conversions!(Tier {
        Bronze => "bronze",
        Gold => "gold",
    });

    #[test]
    fn test_display_uses_wire_name() {
        assert_eq!(Tier::Bronze.to_string(), "bronze");
        assert_eq!(Tier::Gold.as_str(), "gold");
    }

    #[test]
    fn test_parse_ignores_case_and_whitespace() {
        assert_eq!(Tier::from_str(" GoLd ").unwrap(), Tier::Gold);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        let err = Tier::from_str("platinum").unwrap_err();
        assert!(matches!(err, BulwarkError::InvalidInput(ref msg) if msg.contains("Tier")));
    }
}
