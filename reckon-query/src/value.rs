//! Values carried by filters and bound as query parameters.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A value that can be compared against a column.
///
/// Deserialization is untagged: an RFC 3339 string becomes a `DateTime`,
/// a `YYYY-MM-DD` string a `Date`, any other string stays a `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Instant with a fixed offset.
    DateTime(DateTime<FixedOffset>),
    /// Calendar day.
    Date(NaiveDate),
    /// String value.
    String(String),
}

/// Values held by a single filter. Almost always one or two entries.
pub type ValueList = SmallVec<[FilterValue; 2]>;

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret the value as an integer (integer strings included).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a number (numeric strings included).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as an instant in `offset`.
    ///
    /// A bare date is midnight of that day in `offset`.
    pub fn as_datetime(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt.with_timezone(&offset)),
            Self::Date(d) => start_of_day(*d, offset),
            Self::String(s) => {
                let s = s.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    Some(dt.with_timezone(&offset))
                } else {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| start_of_day(d, offset))
                }
            }
            _ => None,
        }
    }

    /// Interpret the value as a calendar day in `offset`.
    pub fn as_date(&self, offset: FixedOffset) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            other => other.as_datetime(offset).map(|dt| dt.date_naive()),
        }
    }

    /// Text used in LIKE patterns.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::DateTime(dt) => Some(dt.to_rfc3339()),
            Self::Date(d) => Some(d.to_string()),
            Self::String(s) => Some(s.clone()),
        }
    }
}

/// Midnight starting `day` in `offset`.
pub(crate) fn start_of_day(day: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .single()
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<FixedOffset>> for FilterValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_filter_value_from() {
        assert_eq!(FilterValue::from(42i32), FilterValue::Int(42));
        assert_eq!(FilterValue::from("hello"), FilterValue::String("hello".to_string()));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
    }

    #[test]
    fn test_integer_strings() {
        assert_eq!(FilterValue::from("7").as_i64(), Some(7));
        assert_eq!(FilterValue::from(" 3 ").as_i64(), Some(3));
        assert_eq!(FilterValue::from("seven").as_i64(), None);
        assert_eq!(FilterValue::Float(2.5).as_i64(), None);
    }

    #[test]
    fn test_date_string_is_midnight() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = FilterValue::from("2024-03-05").as_datetime(offset).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-05T00:00:00+02:00");
    }

    #[test]
    fn test_rfc3339_is_moved_into_offset() {
        let value = FilterValue::from("2024-03-05T23:30:00+00:00");
        let offset = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            value.as_date(offset),
            NaiveDate::from_ymd_opt(2024, 3, 6)
        );
        assert_eq!(value.as_date(utc()), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<FilterValue> =
            serde_json::from_str(r#"[null, 7, 1.5, "2024-01-02", "open"]"#).unwrap();
        assert_eq!(values[0], FilterValue::Null);
        assert_eq!(values[1], FilterValue::Int(7));
        assert_eq!(values[2], FilterValue::Float(1.5));
        assert_eq!(
            values[3],
            FilterValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
        assert_eq!(values[4], FilterValue::String("open".into()));
    }
}
