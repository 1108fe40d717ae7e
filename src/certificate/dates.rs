use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How a date is written onto the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    /// "January 15, 2024"
    #[default]
    Long,
    /// "15-01-2024"
    NumericDmy,
}

impl DateMode {
    fn pattern(self) -> &'static str {
        match self {
            DateMode::Long => "%B %d, %Y",
            DateMode::NumericDmy => "%d-%m-%Y",
        }
    }
}

/// A roster date: either a real calendar date or whatever text the upstream
/// data carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Date(NaiveDate),
    Text(String),
}

impl DateValue {
    /// Builds a value from raw text, keeping it structured when it parses.
    pub fn parse(raw: &str) -> Self {
        match parse_date(raw) {
            Some(date) => DateValue::Date(date),
            None => DateValue::Text(raw.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, DateValue::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        DateValue::Date(date)
    }
}

impl From<&str> for DateValue {
    fn from(raw: &str) -> Self {
        DateValue::parse(raw)
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DateValue::parse(raw.trim()))
    }
}

/// Parses ISO dates, including the datetime strings spreadsheet tools emit
/// for date cells.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// Renders a date for the certificate. Unparseable text comes back verbatim.
pub fn format_date(value: &DateValue, mode: DateMode) -> String {
    match value {
        DateValue::Date(date) => date.format(mode.pattern()).to_string(),
        DateValue::Text(raw) => match parse_date(raw) {
            Some(date) => date.format(mode.pattern()).to_string(),
            None => raw.clone(),
        },
    }
}
