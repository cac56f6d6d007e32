//! Serde adapter storing [`Duration`] values as integer milliseconds.
//!
//! Config files stay readable (`poll_interval: 250`) and accept either a
//! number or a numeric string, mirroring how hand-edited files tend to drift.
use std::time::Duration;

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(value.as_millis() as u64)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MillisInput {
        String(String),
        Number(u64),
    }

    match MillisInput::deserialize(deserializer)? {
        MillisInput::String(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(D::Error::custom),
        MillisInput::Number(value) => Ok(Duration::from_millis(value)),
    }
}
