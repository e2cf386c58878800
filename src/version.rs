//! Version cursor protocol.
//!
//! The external scheduler identifies lock states by opaque version tokens.
//! A token is the lock's last-mutation timestamp serialized as a decimal
//! seconds string (`"<secs>.<micros>"`). The epoch token `"0"` stands for
//! "never seen anything" and is the default when the driver supplies no
//! version.

use crate::error::{GatelockError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque version token exchanged with the external driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Decimal seconds since the epoch, as a string.
    pub timestamp: String,
}

impl Version {
    /// The epoch token, used when the driver has no version yet.
    pub fn epoch() -> Self {
        Self {
            timestamp: "0".to_string(),
        }
    }

    /// Build a token from a lock timestamp.
    pub fn from_datetime(ts: DateTime<Utc>) -> Self {
        Self {
            timestamp: encode_timestamp(ts),
        }
    }

    /// Decode the token back into an instant.
    ///
    /// Accepts both plain integer seconds (`"0"`, `"1700000000"`) and
    /// fractional forms (`"1700000000.123456"`).
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        let (secs, frac) = match raw.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (raw, ""),
        };

        let secs: i64 = secs.parse().map_err(|_| {
            GatelockError::Config(format!("invalid version timestamp '{}'", self.timestamp))
        })?;

        let nanos: u32 = if frac.is_empty() {
            0
        } else if frac.bytes().all(|b| b.is_ascii_digit()) {
            // Right-pad the fractional part to nanosecond precision.
            let padded = format!("{:0<9}", frac);
            padded[..9].parse().map_err(|_| {
                GatelockError::Config(format!("invalid version timestamp '{}'", self.timestamp))
            })?
        } else {
            return Err(GatelockError::Config(format!(
                "invalid version timestamp '{}'",
                self.timestamp
            )));
        };

        DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
            GatelockError::Config(format!(
                "version timestamp '{}' is out of range",
                self.timestamp
            ))
        })
    }
}

/// Serialize an instant as a decimal seconds string.
///
/// Microsecond precision matches what the store retains, so a token
/// round-trips through the driver without drifting.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    format!("{}.{:06}", ts.timestamp(), ts.timestamp_subsec_micros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_token_decodes_to_epoch() {
        let version = Version::epoch();
        let ts = version.to_datetime().unwrap();
        assert_eq!(ts, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn round_trip_preserves_microseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let version = Version::from_datetime(ts);
        assert_eq!(version.timestamp, "1700000000.123456");
        assert_eq!(version.to_datetime().unwrap(), ts);
    }

    #[test]
    fn integer_seconds_parse() {
        let version = Version {
            timestamp: "1700000000".to_string(),
        };
        let ts = version.to_datetime().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 0);
    }

    #[test]
    fn short_fraction_is_right_padded() {
        let version = Version {
            timestamp: "10.5".to_string(),
        };
        let ts = version.to_datetime().unwrap();
        assert_eq!(ts.timestamp(), 10);
        assert_eq!(ts.timestamp_subsec_micros(), 500_000);
    }

    #[test]
    fn garbage_token_is_a_config_error() {
        let version = Version {
            timestamp: "not-a-timestamp".to_string(),
        };
        let err = version.to_datetime().unwrap_err();
        assert!(matches!(err, GatelockError::Config(_)));
    }

    #[test]
    fn serializes_as_timestamp_object() {
        let version = Version::from_datetime(Utc.timestamp_opt(42, 0).unwrap());
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, r#"{"timestamp":"42.000000"}"#);
    }
}
