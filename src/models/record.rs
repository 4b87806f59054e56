//! Harvested post records.
//!
//! Records keep the field names of the archives written by earlier
//! collectors (`tweet` for the text, `sentiment` for the annotation slot) so
//! old and new archives can be merged and re-seeded interchangeably.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Text some layouts render for posts with no readable body.
pub const PLACEHOLDER_TEXT: &str = "No content";

/// A single harvested post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Calendar date the post was published.
    pub date: NaiveDate,
    /// Post body. Dedup identity is this field alone.
    #[serde(rename = "tweet")]
    pub text: String,
    /// Reserved for downstream enrichment; the collector always leaves it empty.
    #[serde(rename = "sentiment", default)]
    pub annotation: String,
}

impl Record {
    pub fn new(date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            date,
            text: text.into(),
            annotation: String::new(),
        }
    }

    /// Build a record from one extracted element, if it carries enough data.
    ///
    /// The date is the part of the `datetime` attribute before `T`; posts
    /// without a parseable date, or with empty/placeholder text, are dropped.
    pub fn from_raw(raw: &RawPost) -> Option<Self> {
        let datetime = raw.datetime.as_deref()?;
        let day = datetime.split('T').next()?.trim();
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;

        let text = raw.text.as_deref()?;
        if text.trim().is_empty() || text == PLACEHOLDER_TEXT {
            return None;
        }

        Some(Self::new(date, text))
    }
}

/// What one extraction pass reports for a rendered post element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPost {
    /// Value of the element's `datetime` attribute, e.g. `2024-01-03T10:22:00.000Z`.
    #[serde(default)]
    pub datetime: Option<String>,
    /// Rendered text of the post body.
    #[serde(default)]
    pub text: Option<String>,
}

impl RawPost {
    pub fn new(datetime: Option<&str>, text: Option<&str>) -> Self {
        Self {
            datetime: datetime.map(str::to_string),
            text: text.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_takes_date_part() {
        let raw = RawPost::new(Some("2024-01-03T10:22:00.000Z"), Some("BBRI naik"));
        let record = Record::from_raw(&raw).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(record.text, "BBRI naik");
        assert!(record.annotation.is_empty());
    }

    #[test]
    fn test_from_raw_rejects_missing_date() {
        assert!(Record::from_raw(&RawPost::new(None, Some("text"))).is_none());
        assert!(Record::from_raw(&RawPost::new(Some("yesterday"), Some("text"))).is_none());
    }

    #[test]
    fn test_from_raw_rejects_placeholder_and_empty_text() {
        assert!(Record::from_raw(&RawPost::new(Some("2024-01-03"), Some(PLACEHOLDER_TEXT))).is_none());
        assert!(Record::from_raw(&RawPost::new(Some("2024-01-03"), Some("  "))).is_none());
        assert!(Record::from_raw(&RawPost::new(Some("2024-01-03"), None)).is_none());
    }

    #[test]
    fn test_serializes_legacy_field_names() {
        let record = Record::new(NaiveDate::from_ymd_opt(2019, 5, 1).unwrap(), "hello");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2019-05-01", "tweet": "hello", "sentiment": ""})
        );
    }

    #[test]
    fn test_deserializes_without_annotation() {
        let record: Record =
            serde_json::from_str(r#"{"date": "2020-02-02", "tweet": "x"}"#).unwrap();
        assert_eq!(record.annotation, "");
    }
}
