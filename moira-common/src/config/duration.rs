//! Duration parsing for config fields that accept either a human duration
//! (`"30s"`, `"1h"`) or the legacy colon form (`"hh:mm"`) — `resending_timeout`
//! in particular is documented as accepting both.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A `Duration` newtype that (de)serializes as a human-readable string,
/// accepting the colon form `hh:mm` as an alias for backwards compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<HumanDuration> for Duration {
    fn from(h: HumanDuration) -> Self {
        h.0
    }
}

/// Parse either `humantime` syntax or the legacy `hh:mm` colon form.
///
/// # Errors
/// Returns an error if the string matches neither grammar.
pub fn parse(raw: &str) -> Result<Duration, String> {
    if let Some((hours, minutes)) = raw.split_once(':') {
        let hours: u64 = hours
            .trim()
            .parse()
            .map_err(|_| format!("invalid hour component in {raw:?}"))?;
        let minutes: u64 = minutes
            .trim()
            .parse()
            .map_err(|_| format!("invalid minute component in {raw:?}"))?;
        return Ok(Duration::from_secs(hours * 3600 + minutes * 60));
    }

    humantime::parse_duration(raw).map_err(|e| e.to_string())
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration like \"30s\", \"1h\", or the legacy \"hh:mm\" form")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse(v).map_err(de::Error::custom)
    }
}

/// A `serde(with = ...)`-compatible deserializer for bare `Duration` fields.
pub fn deserialize_duration<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    d.deserialize_str(DurationVisitor)
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        deserialize_duration(d).map(Self)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_human_duration() {
        assert_eq!(parse("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn parses_colon_form() {
        assert_eq!(parse("00:30").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse("02:15").unwrap(), Duration::from_secs(2 * 3600 + 15 * 60));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("not-a-duration").is_err());
    }

    #[test]
    fn human_duration_round_trips_through_json() {
        let original = HumanDuration(Duration::from_secs(90));
        let json = serde_json::to_string(&original).unwrap();
        let restored: HumanDuration = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn human_duration_deserializes_colon_form() {
        let restored: HumanDuration = serde_json::from_str("\"00:30\"").unwrap();
        assert_eq!(restored.as_duration(), Duration::from_secs(1800));
    }
}
