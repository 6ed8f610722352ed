//! Lenient request-field decoding
//!
//! Form-driven clients send numbers as strings ("75.5"), blank strings
//! for "not set" and dates as `YYYY-MM`, `YYYY-MM-DD` or RFC 3339. These
//! helpers are used with `#[serde(default, deserialize_with = "...")]`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(v)) => Ok(Some(v as f64)),
        Some(NumberOrString::Float(v)) => Ok(Some(v)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {}", s))),
    }
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(v)) => Ok(Some(v)),
        Some(NumberOrString::Float(v)) => Ok(Some(v.trunc() as i64)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid integer: {}", s))),
    }
}

pub fn opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}

/// Blank strings become `None`; everything else is trimmed.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Partial-update variants: `None` when the key is absent (requires
/// `#[serde(default)]`), `Some(None)` when it is null or blank.
pub fn clearable_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string(deserializer).map(Some)
}

pub fn clearable_f64<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    opt_f64(deserializer).map(Some)
}

pub fn clearable_i64<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    opt_i64(deserializer).map(Some)
}

/// Parse `YYYY-MM` (first of the month), `YYYY-MM-DD` or RFC 3339.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[derive(Deserialize)]
    struct Rates {
        #[serde(default, deserialize_with = "opt_f64")]
        hourly: Option<f64>,
        #[serde(default, deserialize_with = "opt_i64")]
        years: Option<i64>,
        #[serde(default, deserialize_with = "opt_datetime")]
        start: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_numbers_accept_strings_and_blanks() {
        let rates: Rates = serde_json::from_str(r#"{"hourly": "75.5", "years": "", "start": null}"#).unwrap();
        assert_eq!(rates.hourly, Some(75.5));
        assert_eq!(rates.years, None);
        assert_eq!(rates.start, None);

        let rates: Rates = serde_json::from_str(r#"{"hourly": 40, "years": 3}"#).unwrap();
        assert_eq!(rates.hourly, Some(40.0));
        assert_eq!(rates.years, Some(3));
    }

    #[derive(Deserialize)]
    struct Edit {
        #[serde(default, deserialize_with = "clearable_string")]
        headline: Option<Option<String>>,
        #[serde(default, deserialize_with = "clearable_f64")]
        rate: Option<Option<f64>>,
    }

    #[test]
    fn test_clearable_fields_tell_absent_from_blank() {
        let edit: Edit = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(edit.headline, None);
        assert_eq!(edit.rate, None);

        let edit: Edit = serde_json::from_str(r#"{"headline": "  ", "rate": null}"#).unwrap();
        assert_eq!(edit.headline, Some(None));
        assert_eq!(edit.rate, Some(None));

        let edit: Edit = serde_json::from_str(r#"{"headline": " Welder ", "rate": "40"}"#).unwrap();
        assert_eq!(edit.headline, Some(Some("Welder".to_string())));
        assert_eq!(edit.rate, Some(Some(40.0)));
    }

    #[test]
    fn test_bad_number_is_rejected() {
        assert!(serde_json::from_str::<Rates>(r#"{"hourly": "lots"}"#).is_err());
    }

    #[test]
    fn test_month_dates_resolve_to_first_day() {
        let date = parse_date("2021-06").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2021, 6, 1));

        let date = parse_date("2021-06-15").unwrap();
        assert_eq!(date.day(), 15);

        assert!(parse_date("2024-03-01T10:00:00Z").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
