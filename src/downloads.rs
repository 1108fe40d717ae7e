// Append-only certificate download history.
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub use crate::roster::{DownloadLogEntry, StudentDownloads};

pub struct DownloadLog {
    entries: Mutex<Vec<DownloadLogEntry>>,
    file: Option<PathBuf>,
}

impl DownloadLog {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            file: None,
        }
    }

    /// Replays an existing JSON-lines log and keeps appending to it.
    pub fn open(path: &Path) -> Self {
        let mut entries = Vec::new();
        if let Ok(raw) = std::fs::read_to_string(path) {
            for (number, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                match serde_json::from_str::<DownloadLogEntry>(line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!("Skipping download log line {}: {}", number + 1, e),
                }
            }
            info!("Loaded {} download records from {}", entries.len(), path.display());
        }

        Self {
            entries: Mutex::new(entries),
            file: Some(path.to_path_buf()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DownloadLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Never fails: a log that cannot be persisted must not cost the student
    /// their certificate.
    pub fn record(&self, entry: DownloadLogEntry) {
        let mut entries = self.lock();
        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, &entry) {
                warn!("Failed to persist download of {}: {}", entry.filename, e);
            }
        }
        entries.push(entry);
    }

    pub fn entries(&self) -> Vec<DownloadLogEntry> {
        self.lock().clone()
    }

    pub fn total(&self) -> usize {
        self.lock().len()
    }

    /// Download count and latest download per student, most recent first.
    pub fn summary(&self) -> Vec<StudentDownloads> {
        let entries = self.lock();
        let mut by_student: HashMap<&str, StudentDownloads> = HashMap::new();
        for entry in entries.iter() {
            by_student
                .entry(entry.sixerclass_id.as_str())
                .and_modify(|s| {
                    s.count += 1;
                    if entry.download_time >= s.last_download {
                        s.last_download = entry.download_time;
                        s.student_name = entry.student_name.clone();
                    }
                })
                .or_insert_with(|| StudentDownloads {
                    sixerclass_id: entry.sixerclass_id.clone(),
                    student_name: entry.student_name.clone(),
                    count: 1,
                    last_download: entry.download_time,
                });
        }

        let mut summary: Vec<_> = by_student.into_values().collect();
        summary.sort_by(|a, b| {
            b.last_download
                .cmp(&a.last_download)
                .then_with(|| a.sixerclass_id.cmp(&b.sixerclass_id))
        });
        summary
    }
}

fn append_line(path: &Path, entry: &DownloadLogEntry) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}
