use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parses RFC 3339, falling back to a naive ISO-8601 timestamp read as UTC.
pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))?;
    Ok(naive.and_utc())
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn accepts_offset_and_naive_timestamps() {
        let with_offset = parse_timestamp("2025-03-01T10:15:00+02:00").unwrap();
        assert_eq!(with_offset.hour(), 8);

        let naive = parse_timestamp("2025-03-01T10:15:00.123456").unwrap();
        assert_eq!(naive.hour(), 10);

        let spaced = parse_timestamp("2025-03-01 10:15:00").unwrap();
        assert_eq!(spaced.minute(), 15);

        assert!(parse_timestamp("yesterday").is_err());
    }
}
