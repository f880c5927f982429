//! Lenient field decoders.
//!
//! The listing forms submit numeric inputs as strings (`"12000"`, `""`), so
//! the API hands back a mix of numbers and numeric strings for the same field.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64(self) -> Result<Option<f64>, String> {
        match self {
            NumberOrText::Int(v) => Ok(Some(v as f64)),
            NumberOrText::Float(v) => Ok(Some(v)),
            NumberOrText::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("expected a number, found {:?}", s))
            }
        }
    }

    fn into_u32(self) -> Result<Option<u32>, String> {
        match self.into_f64()? {
            None => Ok(None),
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(Some(v as u32)),
            Some(v) => Err(format!("expected a non-negative integer, found {}", v)),
        }
    }
}

pub fn u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrText::deserialize(deserializer)?
        .into_u32()
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("expected an integer, found an empty value"))
}

pub fn f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrText::deserialize(deserializer)?
        .into_f64()
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("expected a number, found an empty value"))
}

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_u32().map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_f64().map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// Accepts `2024-06-01`, `2024-06-01T00:00:00` and full RFC 3339 timestamps.
pub fn date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date {:?}", raw)))
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "u32")]
        bhk: u32,
        #[serde(default, deserialize_with = "opt_f64")]
        advance: Option<f64>,
    }

    #[test]
    fn numbers_may_arrive_as_strings() {
        let probe: Probe = serde_json::from_str(r#"{"bhk":"2","advance":"50000"}"#).unwrap();
        assert_eq!(probe.bhk, 2);
        assert_eq!(probe.advance, Some(50000.0));
    }

    #[test]
    fn empty_optional_strings_are_absent() {
        let probe: Probe = serde_json::from_str(r#"{"bhk":3,"advance":""}"#).unwrap();
        assert_eq!(probe.advance, None);
    }

    #[test]
    fn fractional_or_negative_counts_are_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"bhk":"2.5"}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"bhk":-1}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"bhk":""}"#).is_err());
    }

    #[test]
    fn dates_accept_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(parse_date("2024-06-01"), Some(expected));
        assert_eq!(parse_date("2024-06-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2024-06-01T10:30:00.000"), Some(expected));
        assert_eq!(parse_date("next week"), None);
    }
}
