use std::io::Write;
use std::path::{Path, PathBuf};

pub fn ensure_dirs(dirs: &[&Path]) -> std::io::Result<()> {
    for dir in dirs {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Writes `bytes` to a temp file next to the destination and renames it into
/// place, so readers only ever see complete files.
pub fn write_atomically(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    let target = dir.join(filename);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}
