//! The shared JSON decoder handed to classification and custom handlers.
//!
//! Payload date fields use a single wire format, `yyyy-MM-dd'T'HH:mm:ss.SSSZ`
//! (for example `2024-03-01T12:30:45.123+0000`). Payload types opt into it
//! with `#[serde(with = "api_request::decoder::timestamp")]`.

use serde::de::DeserializeOwned;

/// chrono rendering of `yyyy-MM-dd'T'HH:mm:ss.SSSZ`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

static SHARED: Decoder = Decoder { _private: () };

#[derive(Debug)]
pub struct Decoder {
    _private: (),
}

impl Decoder {
    /// The single decoder instance every request shares.
    pub fn shared() -> &'static Decoder {
        &SHARED
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn timestamp_format(&self) -> &'static str {
        TIMESTAMP_FORMAT
    }
}

/// serde adapter for `DateTime<FixedOffset>` fields in the fixed format.
///
/// Parsing also accepts RFC 3339 (`Z` or `+00:00` offsets) since servers
/// frequently mix the two.
pub mod timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub(crate) fn parse(raw: &str) -> Result<DateTime<FixedOffset>, String> {
        DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
    }

    /// Same format for `Option<DateTime<FixedOffset>>` fields.
    pub mod option {
        use chrono::{DateTime, FixedOffset};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(
            value: &Option<DateTime<FixedOffset>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}
