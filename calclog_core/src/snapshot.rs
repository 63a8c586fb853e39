//! Ledger snapshot persistence with file locking.
//!
//! The whole ledger is rewritten on every save: the snapshot is written to a
//! temp file in the same directory, synced, then renamed over the original.

use crate::{Error, LedgerSnapshot, Result};
use fs2::FileExt;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl LedgerSnapshot {
    /// Read a snapshot with a shared lock.
    ///
    /// Returns `Ok(None)` when no file exists yet. Any read or parse failure
    /// (including a file truncated by a crash mid-write) is an `Error::Load`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = read_locked(path).map_err(|e| Error::load(path, e))?;
        let snapshot = serde_json::from_str::<LedgerSnapshot>(&contents)
            .map_err(|e| Error::load(path, e))?;

        tracing::debug!(
            "Loaded {} calculations from {:?}",
            snapshot.calculations.len(),
            path
        );
        Ok(Some(snapshot))
    }

    /// Atomically replace the snapshot at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).map_err(|e| Error::save(path, e))?;
        tracing::debug!(
            "Saved {} calculations to {:?}",
            self.calculations.len(),
            path
        );
        Ok(())
    }
}

fn read_locked(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let _ = file.unlock();
    read?;

    Ok(contents)
}

/// Write `value` as pretty JSON via temp file + rename
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
