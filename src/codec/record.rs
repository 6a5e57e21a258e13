//! Persisted record shape.
//!
//! Each entry is one JSON object inside the stored array:
//!
//! ```text
//! {"loc_name":"theme","loc_value":"dark","loc_time":60,"loc_created_date":"2024-05-01T10:00:00.000Z"}
//! ```
//!
//! Unknown fields are ignored on decode. Older writers stored whatever the
//! caller handed them, so `loc_name`/`loc_value` also accept JSON numbers and
//! booleans, and `loc_time` accepts a numeric string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named, expiring value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique name within the collection
    #[serde(rename = "loc_name", deserialize_with = "lenient::string")]
    pub name: String,

    /// Stored payload
    #[serde(rename = "loc_value", deserialize_with = "lenient::string")]
    pub value: String,

    /// Seconds of validity counted from `created_at`
    #[serde(rename = "loc_time", deserialize_with = "lenient::seconds")]
    pub ttl_seconds: i64,

    /// Wall-clock instant the entry was written
    #[serde(rename = "loc_created_date", with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Creates an entry stamped with `created_at`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ttl_seconds,
            created_at,
        }
    }
}

/// ISO-8601 in UTC with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

mod lenient {
    use serde::{de::Error as _, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!("expected a string, found {other}"))),
        }
    }

    pub fn seconds<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .ok_or_else(|| D::Error::custom(format!("TTL out of range: {n}"))),
            Value::String(s) => parse_seconds(&s)
                .ok_or_else(|| D::Error::custom(format!("TTL is not a number: {s:?}"))),
            other => Err(D::Error::custom(format!("expected TTL seconds, found {other}"))),
        }
    }

    fn parse_seconds(s: &str) -> Option<i64> {
        let s = s.trim();
        s.parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
    }
}
