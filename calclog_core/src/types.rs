//! Core domain types for the calclog history ledger.
//!
//! This module defines:
//! - Calculation entries as recorded by the calculator
//! - The persisted ledger snapshot
//! - The structured export document (also used for backups)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a calculation entry
pub type EntryId = u64;

/// Default maximum number of entries kept in the ledger
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

// ============================================================================
// Entries
// ============================================================================

/// One completed calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalculationEntry {
    pub id: EntryId,
    /// Rendered text, e.g. "3 + 4 = 7"
    pub calculation: String,
    pub result: Option<f64>,
    pub operation_type: String,
    #[serde(deserialize_with = "deserialize_local")]
    pub timestamp: DateTime<Local>,
    /// Start instant of the run that recorded this entry
    #[serde(deserialize_with = "deserialize_local")]
    pub session_id: DateTime<Local>,
}

impl CalculationEntry {
    /// Case-insensitive match against the calculation text and operation type.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.calculation.to_lowercase().contains(needle)
            || self.operation_type.to_lowercase().contains(needle)
    }

    pub fn is_from_session(&self, session_start: &DateTime<Local>) -> bool {
        self.session_id == *session_start
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Full durable state of the ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(deserialize_with = "deserialize_local")]
    pub last_updated: DateTime<Local>,
    #[serde(deserialize_with = "deserialize_local")]
    pub session_start: DateTime<Local>,
    /// Next id to hand out; absent in files written by older tools
    #[serde(default)]
    pub next_id: Option<EntryId>,
    #[serde(default)]
    pub calculations: Vec<CalculationEntry>,
}

impl LedgerSnapshot {
    /// Id counter to resume from, never lower than any stored id
    pub fn resume_id(&self) -> EntryId {
        let after_max = self
            .calculations
            .iter()
            .map(|e| e.id)
            .max()
            .map_or(1, |max| max + 1);
        self.next_id.map_or(after_max, |next| next.max(after_max))
    }
}

/// Structured export / backup document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(deserialize_with = "deserialize_local")]
    pub export_date: DateTime<Local>,
    pub total_calculations: usize,
    #[serde(deserialize_with = "deserialize_local")]
    pub session_start: DateTime<Local>,
    pub calculations: Vec<CalculationEntry>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse an RFC 3339 timestamp, or an offset-less ISO 8601 one read as local
/// time (the layout older history files were written with).
pub fn parse_local_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    // A wall-clock time skipped by a DST change has no local instant
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive)),
    )
}

fn deserialize_local<'de, D>(deserializer: D) -> std::result::Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_local_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}
