//! Export of the ledger to structured (JSON), tabular (CSV) and narrative
//! (plain text) documents, plus the backup-gated clear.
//!
//! Every export is written to a temporary file in the target directory and
//! then moved to a fresh, timestamp-suffixed name without replacing anything
//! already there. A failed write leaves no file behind.

use crate::format::{title_case, TIMESTAMP_FORMAT};
use crate::{CalculationEntry, Error, ExportDocument, Ledger, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

const EXPORT_STEM: &str = "calculator_export";
const BACKUP_STEM: &str = "history_backup";

/// Output format of an export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full-fidelity JSON, re-importable
    Structured,
    /// CSV, one row per entry; commas in calculations become semicolons
    Tabular,
    /// Human-readable text report
    Narrative,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Structured => "json",
            ExportFormat::Tabular => "csv",
            ExportFormat::Narrative => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "structured" => Ok(ExportFormat::Structured),
            "csv" | "tabular" => Ok(ExportFormat::Tabular),
            "text" | "txt" | "narrative" => Ok(ExportFormat::Narrative),
            other => Err(Error::Usage(format!(
                "Unknown export format '{}' (expected json, csv or text)",
                other
            ))),
        }
    }
}

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Calculation")]
    calculation: String,
    #[serde(rename = "Operation Type")]
    operation_type: String,
    #[serde(rename = "Result")]
    result: String,
}

impl From<&CalculationEntry> for CsvRow {
    fn from(entry: &CalculationEntry) -> Self {
        CsvRow {
            id: entry.id,
            timestamp: entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            calculation: entry.calculation.replace(',', ";"),
            operation_type: entry.operation_type.clone(),
            result: entry
                .result
                .map_or_else(|| "N/A".to_string(), |r| r.to_string()),
        }
    }
}

/// Export the ledger into `dir`, returning the created file
pub fn export(ledger: &Ledger, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    export_at(ledger, format, dir, Local::now())
}

/// Export as of `now` (used for the file name and export date)
pub fn export_at(
    ledger: &Ledger,
    format: ExportFormat,
    dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if ledger.is_empty() {
        return Err(Error::EmptyLedger);
    }

    let path = write_unique(dir, EXPORT_STEM, format.extension(), now, |file| match format {
        ExportFormat::Structured => write_structured(file, ledger, now),
        ExportFormat::Tabular => write_tabular(file, ledger.entries()),
        ExportFormat::Narrative => write_narrative(file, ledger, now),
    })?;

    tracing::info!(
        "Exported {} calculations as {:?} to {:?}",
        ledger.len(),
        format,
        path
    );
    Ok(path)
}

/// Read a structured export (or backup) back in
pub fn import_structured(path: &Path) -> Result<ExportDocument> {
    let file = File::open(path).map_err(|e| Error::load(path, e))?;
    let document: ExportDocument = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| Error::load(path, e))?;
    tracing::debug!(
        "Imported {} calculations from {:?}",
        document.calculations.len(),
        path
    );
    Ok(document)
}

/// Outcome of a successful clear
#[derive(Debug, Clone, PartialEq)]
pub struct ClearReport {
    pub backup_path: PathBuf,
    pub removed: usize,
}

/// Back up the ledger to `backup_dir`, then clear it.
///
/// Confirmation is the caller's job. If the backup cannot be written the
/// ledger is left untouched and `Error::BackupGate` is returned.
pub fn clear_with_backup(ledger: &mut Ledger, backup_dir: &Path) -> Result<ClearReport> {
    if ledger.is_empty() {
        return Err(Error::Usage("History is already empty".into()));
    }

    let now = Local::now();
    let backup_path = write_unique(backup_dir, BACKUP_STEM, "json", now, |file| {
        write_structured(file, ledger, now)
    })
    .map_err(|e| Error::BackupGate {
            source: Box::new(e),
        })?;
    tracing::info!("Backed up history to {:?}", backup_path);

    let removed = ledger.len();
    ledger.clear();

    Ok(ClearReport {
        backup_path,
        removed,
    })
}

/// Write a new `<stem>_<timestamp>.<ext>` in `dir`, adding a counter on
/// collision. The content only appears under its final name once `write`
/// has succeeded.
fn write_unique<F>(
    dir: &Path,
    stem: &str,
    extension: &str,
    now: DateTime<Local>,
    write: F,
) -> Result<PathBuf>
where
    F: FnOnce(&File) -> Result<()>,
{
    std::fs::create_dir_all(dir).map_err(|e| Error::save(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::save(dir, e))?;
    write(temp.as_file()).map_err(|e| Error::save(dir, e))?;

    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}_{}.{}", stem, stamp, extension)
        } else {
            format!("{}_{}_{}.{}", stem, stamp, attempt, extension)
        };
        let path = dir.join(name);

        match temp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                temp = e.file;
                attempt += 1;
            }
            Err(e) => return Err(Error::save(path, e.error)),
        }
    }
}

fn write_structured(file: &File, ledger: &Ledger, now: DateTime<Local>) -> Result<()> {
    let document = ExportDocument {
        export_date: now,
        total_calculations: ledger.len(),
        session_start: ledger.session_start(),
        calculations: ledger.entries().to_vec(),
    };

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);
    file.sync_all()?;
    Ok(())
}

fn write_tabular(file: &File, entries: &[CalculationEntry]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    for entry in entries {
        writer.serialize(CsvRow::from(entry))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;
    Ok(())
}

fn write_narrative(file: &File, ledger: &Ledger, now: DateTime<Local>) -> Result<()> {
    let mut w = BufWriter::new(file);

    writeln!(w, "COMPLEX CALCULATOR - CALCULATION HISTORY")?;
    writeln!(w, "{}", "=".repeat(50))?;
    writeln!(w)?;
    writeln!(w, "Export Date: {}", now.format(TIMESTAMP_FORMAT))?;
    writeln!(w, "Total Calculations: {}", ledger.len())?;
    writeln!(
        w,
        "Session Started: {}",
        ledger.session_start().format(TIMESTAMP_FORMAT)
    )?;
    writeln!(w)?;
    writeln!(w, "CALCULATIONS:")?;
    writeln!(w, "{}", "-".repeat(30))?;

    for entry in ledger.entries() {
        writeln!(
            w,
            "[{:>3}] {}",
            entry.id,
            entry.timestamp.format(TIMESTAMP_FORMAT)
        )?;
        writeln!(w, "     {}", entry.calculation)?;
        writeln!(w, "     Type: {}", title_case(&entry.operation_type))?;
        writeln!(w)?;
    }

    w.flush()?;
    drop(w);
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 20, 14, min, 0).unwrap()
    }

    fn scenario(dir: &tempfile::TempDir) -> Ledger {
        let mut ledger = Ledger::load(dir.path().join("history.json"), at(0));
        ledger.append_at("1 + 2 = 3", Some(3.0), "basic", at(1));
        ledger.append_at("max(1, 2) = 2", Some(2.0), "basic", at(2));
        ledger.append_at("sqrt(9) = 3", None, "advanced", at(3));
        ledger
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Structured);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Tabular);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Narrative);
        assert!(matches!("xml".parse::<ExportFormat>(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_structured_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = scenario(&temp_dir);
        let out = temp_dir.path().join("exports");

        let path = export(&ledger, ExportFormat::Structured, &out).unwrap();
        let document = import_structured(&path).unwrap();

        assert_eq!(document.total_calculations, 3);
        assert_eq!(document.session_start, ledger.session_start());
        assert_eq!(document.calculations, ledger.entries());
    }

    #[test]
    fn test_tabular_replaces_commas() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = scenario(&temp_dir);
        let out = temp_dir.path().join("exports");

        let path = export(&ledger, ExportFormat::Tabular, &out).unwrap();
        assert_eq!(path.extension().unwrap(), "csv");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "ID,Timestamp,Calculation,Operation Type,Result");
        assert_eq!(lines[2], "2,2024-07-20 14:02:00,max(1; 2) = 2,basic,2");
        assert_eq!(lines[3], "3,2024-07-20 14:03:00,sqrt(9) = 3,advanced,N/A");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        for record in reader.records() {
            assert_eq!(record.unwrap().len(), 5);
        }
    }

    #[test]
    fn test_narrative_report() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = scenario(&temp_dir);
        let out = temp_dir.path().join("exports");

        let path = export(&ledger, ExportFormat::Narrative, &out).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();

        assert!(contents.starts_with("COMPLEX CALCULATOR - CALCULATION HISTORY"));
        assert!(contents.contains("Total Calculations: 3"));
        assert!(contents.contains("Session Started: 2024-07-20 14:00:00"));
        assert!(contents.contains("[  3] 2024-07-20 14:03:00\n     sqrt(9) = 3\n     Type: Advanced"));
    }

    #[test]
    fn test_export_never_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = scenario(&temp_dir);
        let out = temp_dir.path().join("exports");

        let first = export_at(&ledger, ExportFormat::Structured, &out, at(30)).unwrap();
        let second = export_at(&ledger, ExportFormat::Structured, &out, at(30)).unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("calculator_export_20240720_143000.json"));
        assert!(second.ends_with("calculator_export_20240720_143000_1.json"));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out = temp_dir.path().join("exports");

        let result = write_unique(&out, EXPORT_STEM, "csv", at(30), |file| {
            let mut w = BufWriter::new(file);
            writeln!(w, "ID,Timestamp")?;
            w.flush()?;
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        });

        assert!(matches!(result, Err(Error::Save { .. })));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_export_empty_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(temp_dir.path().join("history.json"), at(0));

        let result = export(&ledger, ExportFormat::Tabular, temp_dir.path());
        assert!(matches!(result, Err(Error::EmptyLedger)));
    }

    #[test]
    fn test_export_does_not_mutate_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = scenario(&temp_dir);
        let before = ledger.entries().to_vec();

        export(&ledger, ExportFormat::Narrative, temp_dir.path()).unwrap();
        assert_eq!(ledger.entries(), before.as_slice());
    }

    #[test]
    fn test_clear_with_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ledger = scenario(&temp_dir);
        let backups = temp_dir.path().join("backups");

        let report = clear_with_backup(&mut ledger, &backups).unwrap();
        assert_eq!(report.removed, 3);
        assert!(ledger.is_empty());

        let backup = import_structured(&report.backup_path).unwrap();
        assert_eq!(backup.calculations.len(), 3);
        assert_eq!(backup.calculations[0].calculation, "1 + 2 = 3");

        // Cleared state was persisted
        let reloaded = Ledger::load(ledger.path().to_path_buf(), at(0));
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_clear_aborted_when_backup_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ledger = scenario(&temp_dir);

        // A regular file where the backup directory should be
        let backups = temp_dir.path().join("backups");
        std::fs::write(&backups, "not a directory").unwrap();

        let err = clear_with_backup(&mut ledger, &backups).unwrap_err();
        assert!(matches!(err, Error::BackupGate { .. }));
        assert_eq!(ledger.len(), 3);

        let reloaded = Ledger::load(ledger.path().to_path_buf(), at(0));
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_clear_empty_ledger_is_usage_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(temp_dir.path().join("history.json"), at(0));

        let err = clear_with_backup(&mut ledger, temp_dir.path()).unwrap_err();
        assert!(err.is_usage());
    }
}
