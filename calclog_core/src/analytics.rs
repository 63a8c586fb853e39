//! Read-only views and statistics over the ledger.
//!
//! Nothing here mutates the ledger. Empty-state conditions are returned as
//! `Error::EmptyLedger` for views meant for display, and as zeroed values for
//! statistics.

use crate::{CalculationEntry, Error, Ledger, Result};
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

/// Number of distinct days reported in daily activity by default
pub const DEFAULT_ACTIVITY_DAYS: usize = 7;

/// Entries recorded on one local calendar date, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub entries: Vec<&'a CalculationEntry>,
}

/// Count and share of one operation type
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCount {
    pub operation_type: String,
    pub count: usize,
    /// Share of the total, rounded half away from zero to one decimal
    pub percentage: f64,
}

/// Span between the first and last recorded calculation
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub first: DateTime<Local>,
    pub last: DateTime<Local>,
    pub duration: Duration,
    /// Calculations per minute; `None` when the span is zero
    pub per_minute: Option<f64>,
}

/// Aggregate figures over the whole ledger
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total: usize,
    pub this_session: usize,
    /// Sorted by operation type label
    pub by_operation: Vec<OperationCount>,
    pub most_used: Option<String>,
    pub timeline: Option<Timeline>,
    /// Most recent dates first
    pub daily_activity: Vec<(NaiveDate, usize)>,
}

/// What happened during the current run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub calculations: usize,
    pub elapsed: Duration,
    pub most_used: Option<String>,
}

/// The last `limit` entries, most recent first
pub fn show(ledger: &Ledger, limit: usize) -> Result<Vec<&CalculationEntry>> {
    if ledger.is_empty() {
        return Err(Error::EmptyLedger);
    }
    Ok(ledger.recent(limit).iter().rev().collect())
}

/// All entries grouped by local date, newest date first
pub fn show_all_grouped_by_day(ledger: &Ledger) -> Result<Vec<DayGroup<'_>>> {
    if ledger.is_empty() {
        return Err(Error::EmptyLedger);
    }

    let mut days: BTreeMap<NaiveDate, Vec<&CalculationEntry>> = BTreeMap::new();
    for entry in ledger.entries() {
        days.entry(entry.timestamp.date_naive()).or_default().push(entry);
    }

    Ok(days
        .into_iter()
        .rev()
        .map(|(date, entries)| DayGroup { date, entries })
        .collect())
}

/// Case-insensitive search over calculation text and operation type
pub fn search<'a>(ledger: &'a Ledger, term: &str) -> Result<Vec<&'a CalculationEntry>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Err(Error::Usage("Please enter a search term".into()));
    }

    Ok(ledger
        .entries()
        .iter()
        .filter(|e| e.matches(&needle))
        .collect())
}

/// Statistics with the default daily activity window
pub fn statistics(ledger: &Ledger) -> Statistics {
    statistics_with_window(ledger, DEFAULT_ACTIVITY_DAYS)
}

pub fn statistics_with_window(ledger: &Ledger, activity_days: usize) -> Statistics {
    let entries = ledger.entries();
    let total = entries.len();
    let session_start = ledger.session_start();

    let this_session = entries
        .iter()
        .filter(|e| e.is_from_session(&session_start))
        .count();

    let counts = count_by_operation(entries.iter());
    let most_used = most_frequent(&counts);
    let by_operation = counts
        .into_iter()
        .map(|(operation_type, count)| OperationCount {
            operation_type,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    let timeline = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => {
            let duration = last.timestamp - first.timestamp;
            let seconds = duration.num_milliseconds() as f64 / 1000.0;
            let per_minute = (seconds > 0.0).then(|| total as f64 / (seconds / 60.0));
            Some(Timeline {
                first: first.timestamp,
                last: last.timestamp,
                duration,
                per_minute,
            })
        }
        _ => None,
    };

    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for entry in entries {
        *daily.entry(entry.timestamp.date_naive()).or_insert(0) += 1;
    }
    let daily_activity = daily.into_iter().rev().take(activity_days).collect();

    Statistics {
        total,
        this_session,
        by_operation,
        most_used,
        timeline,
        daily_activity,
    }
}

/// Summary of the current run as of `now`
pub fn session_summary(ledger: &Ledger, now: DateTime<Local>) -> SessionSummary {
    let session_start = ledger.session_start();
    let session_entries: Vec<_> = ledger
        .entries()
        .iter()
        .filter(|e| e.is_from_session(&session_start))
        .collect();

    SessionSummary {
        calculations: session_entries.len(),
        elapsed: now - session_start,
        most_used: most_frequent(&count_by_operation(session_entries.into_iter())),
    }
}

fn count_by_operation<'a>(
    entries: impl Iterator<Item = &'a CalculationEntry>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.operation_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Highest count wins; ties go to the lexicographically smallest label
fn most_frequent(counts: &BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (label, &count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.clone())
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}
