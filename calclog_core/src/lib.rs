#![forbid(unsafe_code)]

//! Core history ledger and analytics for the calclog calculator.
//!
//! This crate provides:
//! - Domain types (entries, snapshots, export documents)
//! - The capacity-bounded ledger store and its JSON persistence
//! - Read-only analytics (views, search, statistics)
//! - Export in structured, tabular and narrative formats
//! - Configuration and logging setup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod analytics;
pub mod export;
pub mod format;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::Ledger;
pub use analytics::{
    search, session_summary, show, show_all_grouped_by_day, statistics, statistics_with_window,
    DayGroup, OperationCount, SessionSummary, Statistics, Timeline,
};
pub use export::{clear_with_backup, export, import_structured, ClearReport, ExportFormat};
