//! The ledger store: the single authoritative sequence of calculation
//! entries, mirrored to a JSON snapshot on every mutation.
//!
//! Persistence failures never fail a mutation. They are logged as warnings
//! and the store remembers that memory is ahead of disk until the next
//! successful save.

use crate::{CalculationEntry, EntryId, LedgerSnapshot, Result, DEFAULT_MAX_ENTRIES};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Capacity-bounded, append-only calculation history
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    session_start: DateTime<Local>,
    entries: Vec<CalculationEntry>,
    next_id: EntryId,
    max_entries: usize,
    unsaved: bool,
}

impl Ledger {
    /// Empty, not yet persisted ledger for `path`
    pub fn new(path: impl Into<PathBuf>, session_start: DateTime<Local>) -> Self {
        Self {
            path: path.into(),
            session_start,
            entries: Vec::new(),
            next_id: 1,
            max_entries: DEFAULT_MAX_ENTRIES,
            unsaved: false,
        }
    }

    /// Load the ledger persisted at `path`, starting a new session.
    ///
    /// A missing file yields an empty ledger. An unreadable or corrupt file
    /// is logged as a warning and also yields an empty ledger.
    pub fn load(path: impl Into<PathBuf>, session_start: DateTime<Local>) -> Self {
        let mut ledger = Self::new(path, session_start);

        match LedgerSnapshot::load(&ledger.path) {
            Ok(Some(snapshot)) => {
                ledger.next_id = snapshot.resume_id();
                ledger.entries = snapshot.calculations;
                tracing::info!(
                    "Loaded {} calculations from history",
                    ledger.entries.len()
                );
            }
            Ok(None) => {
                tracing::info!(
                    "No history file found at {:?}, starting empty",
                    ledger.path
                );
            }
            Err(e) => {
                tracing::warn!("{}. Starting with an empty history.", e);
            }
        }

        ledger
    }

    /// Set the retention cap. Applies from the next append.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Record a calculation performed now
    pub fn append(
        &mut self,
        calculation: impl Into<String>,
        result: Option<f64>,
        operation_type: impl Into<String>,
    ) -> EntryId {
        self.append_at(calculation, result, operation_type, Local::now())
    }

    /// Record a calculation performed at `at`
    pub fn append_at(
        &mut self,
        calculation: impl Into<String>,
        result: Option<f64>,
        operation_type: impl Into<String>,
        at: DateTime<Local>,
    ) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;

        let entry = CalculationEntry {
            id,
            calculation: calculation.into(),
            result,
            operation_type: operation_type.into(),
            timestamp: at,
            session_id: self.session_start,
        };
        tracing::debug!("Recording calculation {}: {}", id, entry.calculation);

        self.entries.push(entry);
        self.persist();

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
            tracing::debug!("Evicted {} oldest calculations", excess);
            self.persist();
        }

        id
    }

    /// Remove and return the most recent entry
    pub fn undo_last(&mut self) -> Option<CalculationEntry> {
        let removed = self.entries.pop()?;
        self.persist();
        tracing::debug!("Undid calculation {}", removed.id);
        Some(removed)
    }

    /// First entry carrying `id`
    pub fn get_by_id(&self, id: EntryId) -> Option<&CalculationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> &[CalculationEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Drop every entry and persist the empty ledger.
    ///
    /// The id counter keeps running. Take a backup first, see
    /// [`crate::export::clear_with_backup`].
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.persist();
        tracing::info!("Cleared {} calculations", removed);
    }

    /// Write the snapshot, returning any failure to the caller
    pub fn save(&mut self) -> Result<()> {
        let result = self.snapshot().save(&self.path);
        self.unsaved = result.is_err();
        result
    }

    /// Save, downgrading a failure to a warning
    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::warn!("{}. Changes are kept in memory only.", e);
        }
    }

    /// Capture the full durable state
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            last_updated: Local::now(),
            session_start: self.session_start,
            next_id: Some(self.next_id),
            calculations: self.entries.clone(),
        }
    }

    pub fn entries(&self) -> &[CalculationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_start(&self) -> DateTime<Local> {
        self.session_start
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// True while the last save attempt failed
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }
}
