use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::certificate::DateValue;

/// Column order used for spreadsheet import and export.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "student_name",
    "batch_number",
    "batch_start_date",
    "batch_end_date",
    "sixerclass_id",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_name: String,
    pub batch_number: String,
    pub batch_start_date: DateValue,
    pub batch_end_date: DateValue,
    pub sixerclass_id: String,
}

impl StudentRecord {
    /// Copy with surrounding whitespace removed from every text field.
    pub fn trimmed(&self) -> Self {
        let date = |value: &DateValue| match value {
            DateValue::Text(t) => DateValue::parse(t.trim()),
            other => other.clone(),
        };
        Self {
            student_name: self.student_name.trim().to_string(),
            batch_number: self.batch_number.trim().to_string(),
            batch_start_date: date(&self.batch_start_date),
            batch_end_date: date(&self.batch_end_date),
            sixerclass_id: self.sixerclass_id.trim().to_string(),
        }
    }

    /// Name of the first blank required field, in column order.
    pub fn missing_field(&self) -> Option<&'static str> {
        let blank = [
            self.student_name.trim().is_empty(),
            self.batch_number.trim().is_empty(),
            self.batch_start_date.is_blank(),
            self.batch_end_date.is_blank(),
            self.sixerclass_id.trim().is_empty(),
        ];
        REQUIRED_COLUMNS
            .iter()
            .zip(blank)
            .find(|(_, blank)| *blank)
            .map(|(column, _)| *column)
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.student_name, &self.batch_number, &self.sixerclass_id]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Portal login: all three must match a roster entry exactly.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentCredentials {
    pub student_name: String,
    pub batch_number: String,
    pub sixerclass_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLogEntry {
    pub student_name: String,
    pub sixerclass_id: String,
    pub batch_number: String,
    pub download_time: NaiveDateTime,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentDownloads {
    pub sixerclass_id: String,
    pub student_name: String,
    pub count: usize,
    pub last_download: NaiveDateTime,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub errors: Vec<String>,
}
