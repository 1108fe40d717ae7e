mod models;

pub use models::*;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::certificate::DateValue;
use crate::spreadsheet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("SixerClass ID {0} already exists")]
    DuplicateId(String),
    #[error("Student not found")]
    NotFound,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// In-memory roster, mirrored to a spreadsheet after every change.
pub struct RosterStore {
    records: RwLock<Vec<StudentRecord>>,
    file: Option<PathBuf>,
}

impl RosterStore {
    pub fn new(records: Vec<StudentRecord>, file: Option<PathBuf>) -> Self {
        Self {
            records: RwLock::new(records),
            file,
        }
    }

    /// Loads the roster spreadsheet, seeding it with sample students when
    /// the file does not exist yet. An existing file that cannot be read is
    /// left untouched and reported as an error.
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if !path.exists() {
            let samples = sample_students();
            let store = Self::new(samples.clone(), Some(path.to_path_buf()));
            match store.mirror_records(&samples) {
                Ok(()) => info!("Created sample roster with {} students", samples.len()),
                Err(e) => error!("Failed to write sample roster: {}", e),
            }
            return Ok(store);
        }

        let records = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| spreadsheet::read_records(&bytes).map_err(|e| e.to_string()))
            .map_err(|e| {
                error!("Error loading students from {}: {}", path.display(), e);
                format!("cannot read roster {}: {}", path.display(), e)
            })?;
        info!("Loaded {} students from {}", records.len(), path.display());
        Ok(Self::new(records, Some(path.to_path_buf())))
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All records, or those whose name, batch or id contains `search`
    /// (case-insensitive).
    pub async fn list(&self, search: Option<&str>) -> Vec<StudentRecord> {
        let records = self.records.read().await;
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => records
                .iter()
                .filter(|r| r.matches_search(needle))
                .cloned()
                .collect(),
            None => records.clone(),
        }
    }

    pub async fn get(&self, sixerclass_id: &str) -> Option<StudentRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.sixerclass_id == sixerclass_id)
            .cloned()
    }

    /// Exact match on name, batch and id.
    pub async fn find(&self, credentials: &StudentCredentials) -> Option<StudentRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| {
                r.student_name == credentials.student_name
                    && r.batch_number == credentials.batch_number
                    && r.sixerclass_id == credentials.sixerclass_id
            })
            .cloned()
    }

    pub async fn add(&self, record: StudentRecord) -> Result<StudentRecord, RosterError> {
        let record = record.trimmed();
        if let Some(field) = record.missing_field() {
            return Err(RosterError::MissingField(field));
        }

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.sixerclass_id == record.sixerclass_id) {
            return Err(RosterError::DuplicateId(record.sixerclass_id));
        }
        records.push(record.clone());
        self.mirror(&records);
        info!("Added student: {} ({})", record.student_name, record.sixerclass_id);
        Ok(record)
    }

    /// Replaces the record stored under `original_id`. The id itself may
    /// change as long as the new one is free.
    pub async fn update(&self, original_id: &str, record: StudentRecord) -> Result<StudentRecord, RosterError> {
        let record = record.trimmed();
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|r| r.sixerclass_id == original_id)
            .ok_or(RosterError::NotFound)?;

        if let Some(field) = record.missing_field() {
            return Err(RosterError::MissingField(field));
        }
        if record.sixerclass_id != original_id
            && records.iter().any(|r| r.sixerclass_id == record.sixerclass_id)
        {
            return Err(RosterError::DuplicateId(record.sixerclass_id));
        }

        records[index] = record.clone();
        self.mirror(&records);
        info!("Updated student: {} ({})", record.student_name, record.sixerclass_id);
        Ok(record)
    }

    pub async fn delete(&self, sixerclass_id: &str) -> Result<StudentRecord, RosterError> {
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|r| r.sixerclass_id == sixerclass_id)
            .ok_or(RosterError::NotFound)?;
        let removed = records.remove(index);
        self.mirror(&records);
        info!("Deleted student: {} ({})", removed.student_name, removed.sixerclass_id);
        Ok(removed)
    }

    /// Appends every valid row whose id is not taken yet. Rejected rows are
    /// reported, never fatal.
    pub async fn import(&self, rows: Vec<StudentRecord>) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        let mut records = self.records.write().await;

        for (index, row) in rows.into_iter().enumerate() {
            let row = row.trimmed();
            if let Some(field) = row.missing_field() {
                outcome.errors.push(format!("Row {}: Empty {}", index + 1, field));
                continue;
            }
            if records.iter().any(|r| r.sixerclass_id == row.sixerclass_id) {
                outcome.errors.push(format!("Duplicate ID: {}", row.sixerclass_id));
                continue;
            }
            if !row.sixerclass_id.starts_with("SIX") {
                warn!("Imported id {} does not use the SIX prefix", row.sixerclass_id);
            }
            records.push(row);
            outcome.imported_count += 1;
        }

        if outcome.imported_count > 0 {
            self.mirror(&records);
        }
        info!(
            "Imported {} students ({} rows rejected)",
            outcome.imported_count,
            outcome.errors.len()
        );
        outcome
    }

    /// Best effort: the in-memory roster stays authoritative when the file
    /// cannot be written.
    fn mirror(&self, records: &[StudentRecord]) {
        if let Err(e) = self.mirror_records(records) {
            error!("Error saving roster: {}", e);
        }
    }

    fn mirror_records(&self, records: &[StudentRecord]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let bytes = spreadsheet::write_records(records)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("roster path has no file name")?;
        std::fs::create_dir_all(dir)?;
        crate::storage::write_atomically(dir, filename, &bytes)?;
        Ok(())
    }
}

pub fn sample_students() -> Vec<StudentRecord> {
    [
        ("Rahul Sharma", "AWS-2024-001", "2024-01-15", "2024-04-15", "SIX001"),
        ("Priya Patel", "AWS-2024-001", "2024-01-15", "2024-04-15", "SIX002"),
        ("Amit Kumar", "AWS-2024-002", "2024-02-01", "2024-05-01", "SIX003"),
        ("Neha Gupta", "AWS-2024-002", "2024-02-01", "2024-05-01", "SIX004"),
        ("Vikram Singh", "AWS-2024-002", "2024-02-01", "2024-05-01", "SIX005"),
        ("Anjali Sharma", "AWS-2024-002", "2024-02-01", "2024-05-01", "SIX006"),
    ]
    .into_iter()
    .map(|(name, batch, start, end, id)| StudentRecord {
        student_name: name.to_string(),
        batch_number: batch.to_string(),
        batch_start_date: DateValue::parse(start),
        batch_end_date: DateValue::parse(end),
        sixerclass_id: id.to_string(),
    })
    .collect()
}
