use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(LifecycleStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(VerificationStatus {
    Unverified => "unverified",
    Verified => "verified",
    Corrected => "corrected",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lifecycle_round_trips_through_str() {
        for status in [
            LifecycleStatus::Pending,
            LifecycleStatus::Processing,
            LifecycleStatus::Completed,
            LifecycleStatus::Failed,
        ] {
            let parsed = LifecycleStatus::from_str(status.as_str()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn verification_round_trips_through_str() {
        for status in [
            VerificationStatus::Unverified,
            VerificationStatus::Verified,
            VerificationStatus::Corrected,
        ] {
            let parsed = VerificationStatus::from_str(status.as_str()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = LifecycleStatus::from_str("archived").unwrap_err();
        assert!(err.to_string().contains("archived"));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&LifecycleStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let json = serde_json::to_string(&VerificationStatus::Unverified).unwrap();
        assert_eq!(json, "\"unverified\"");
    }
}
