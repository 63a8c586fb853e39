use calclog_core::format::{format_duration, title_case, TIMESTAMP_FORMAT};
use calclog_core::*;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "calclog")]
#[command(about = "Calculator history ledger and statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a calculation, e.g. "3 + 4 = 7"
    Record {
        calculation: String,

        /// Numeric result (parsed from the text after '=' when omitted)
        #[arg(long, allow_hyphen_values = true)]
        result: Option<f64>,

        /// Operation category
        #[arg(long = "type", default_value = "basic")]
        operation_type: String,
    },

    /// Record every line read from stdin, then print a session summary
    Session {
        /// Operation category for all recorded lines
        #[arg(long = "type", default_value = "basic")]
        operation_type: String,
    },

    /// Remove the most recent calculation
    Undo,

    /// Show a calculation by id
    Get { id: EntryId },

    /// List the most recent calculations, oldest first
    Recent {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Show recent history, newest first
    Show {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the complete history grouped by day
    All,

    /// Search calculations and operation types
    Search { term: String },

    /// Show calculation statistics
    Stats,

    /// Summarize the current session
    Summary,

    /// Export history (json, csv or text)
    Export {
        format: ExportFormat,

        /// Destination directory (defaults to the configured export dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Back up and clear the history
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Keep stdout clean for rendered history; RUST_LOG still overrides
    calclog_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let config = match cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };

    let mut ledger = Ledger::load(config.history_path(), Local::now())
        .with_max_entries(config.retention.max_entries);

    match cli.command {
        Commands::Record {
            calculation,
            result,
            operation_type,
        } => cmd_record(&mut ledger, calculation, result, operation_type),
        Commands::Session { operation_type } => cmd_session(&mut ledger, &operation_type),
        Commands::Undo => cmd_undo(&mut ledger),
        Commands::Get { id } => cmd_get(&ledger, id),
        Commands::Recent { count } => {
            for entry in ledger.recent(count) {
                print_entry(entry);
            }
            Ok(())
        }
        Commands::Show { limit } => cmd_show(&ledger, limit),
        Commands::All => cmd_all(&ledger),
        Commands::Search { term } => cmd_search(&ledger, &term),
        Commands::Stats => cmd_stats(&ledger, &config),
        Commands::Summary => {
            print_summary(&session_summary(&ledger, Local::now()));
            Ok(())
        }
        Commands::Export { format, out } => {
            let dir = out.unwrap_or_else(|| config.export_dir());
            match export(&ledger, format, &dir) {
                Ok(path) => {
                    println!("✓ History exported to {}", path.display());
                    Ok(())
                }
                Err(Error::EmptyLedger) => {
                    println!("No calculations to export!");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Commands::Clear { yes } => cmd_clear(&mut ledger, &config, yes),
    }
}

fn cmd_record(
    ledger: &mut Ledger,
    calculation: String,
    result: Option<f64>,
    operation_type: String,
) -> Result<()> {
    let result = result.or_else(|| parse_result(&calculation));
    let id = ledger.append(calculation, result, operation_type);
    warn_if_unsaved(ledger);
    println!("✓ Recorded calculation #{}", id);
    Ok(())
}

fn cmd_session(ledger: &mut Ledger, operation_type: &str) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line?;
        let calculation = line.trim();
        if calculation.is_empty() {
            continue;
        }
        let id = ledger.append(calculation, parse_result(calculation), operation_type);
        tracing::debug!("Session recorded #{}", id);
    }
    warn_if_unsaved(ledger);

    print_summary(&session_summary(ledger, Local::now()));
    Ok(())
}

fn cmd_undo(ledger: &mut Ledger) -> Result<()> {
    match ledger.undo_last() {
        Some(removed) => println!("↩ Undone: {}", removed.calculation),
        None => println!("No calculations to undo!"),
    }
    warn_if_unsaved(ledger);
    Ok(())
}

fn cmd_get(ledger: &Ledger, id: EntryId) -> Result<()> {
    let entry = ledger
        .get_by_id(id)
        .ok_or_else(|| Error::Usage(format!("No calculation with id {}", id)))?;
    print_entry(entry);
    if let Some(result) = entry.result {
        println!("      Result: {}", result);
    }
    Ok(())
}

fn cmd_show(ledger: &Ledger, limit: usize) -> Result<()> {
    let entries = match show(ledger, limit) {
        Ok(entries) => entries,
        Err(Error::EmptyLedger) => {
            println!("No calculations in history yet!");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("CALCULATION HISTORY (Last {} entries)", entries.len());
    println!("{}", "=".repeat(70));
    for entry in entries {
        print_entry(entry);
        println!("{}", "-".repeat(70));
    }
    Ok(())
}

fn cmd_all(ledger: &Ledger) -> Result<()> {
    let groups = match show_all_grouped_by_day(ledger) {
        Ok(groups) => groups,
        Err(Error::EmptyLedger) => {
            println!("No calculations in history!");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("COMPLETE CALCULATION HISTORY ({} entries)", ledger.len());
    println!("{}", "=".repeat(80));
    for group in groups {
        println!();
        println!("{}", group.date);
        println!("{}", "-".repeat(40));
        for entry in group.entries {
            println!(
                "[{:>3}] {} | {}",
                entry.id,
                entry.timestamp.format("%H:%M:%S"),
                entry.calculation
            );
        }
    }
    Ok(())
}

fn cmd_search(ledger: &Ledger, term: &str) -> Result<()> {
    let matches = search(ledger, term)?;
    if matches.is_empty() {
        println!("No calculations found containing '{}'", term.trim());
        return Ok(());
    }

    println!("Found {} matching calculations:", matches.len());
    println!("{}", "=".repeat(70));
    for entry in matches {
        print_entry(entry);
        println!("{}", "-".repeat(70));
    }
    Ok(())
}

fn cmd_stats(ledger: &Ledger, config: &Config) -> Result<()> {
    let stats = statistics_with_window(ledger, config.statistics.daily_activity_days);
    if stats.total == 0 {
        println!("No calculations for statistics!");
        return Ok(());
    }

    println!("CALCULATION STATISTICS");
    println!("{}", "=".repeat(50));
    println!("Total Calculations: {}", stats.total);
    println!("This Session: {}", stats.this_session);

    println!();
    println!("Operations by Type:");
    for op in &stats.by_operation {
        println!(
            "   {}: {} ({:.1}%)",
            title_case(&op.operation_type),
            op.count,
            op.percentage
        );
    }
    if let Some(most_used) = &stats.most_used {
        println!("   Most used: {}", title_case(most_used));
    }

    if let Some(timeline) = &stats.timeline {
        println!();
        println!("Time Statistics:");
        println!("   First Calculation: {}", timeline.first.format(TIMESTAMP_FORMAT));
        println!("   Latest Calculation: {}", timeline.last.format(TIMESTAMP_FORMAT));
        println!(
            "   Total Duration: {}",
            format_duration(timeline.duration.num_milliseconds() as f64 / 1000.0)
        );
        if let Some(rate) = timeline.per_minute {
            println!("   Average Rate: {:.2} calculations per minute", rate);
        }
    }

    println!();
    println!(
        "Daily Activity (Last {} days):",
        config.statistics.daily_activity_days
    );
    for (date, count) in &stats.daily_activity {
        println!("   {}: {} calculations", date, count);
    }
    Ok(())
}

fn cmd_clear(ledger: &mut Ledger, config: &Config, yes: bool) -> Result<()> {
    if ledger.is_empty() {
        return Err(Error::Usage("History is already empty".into()));
    }

    println!("You are about to delete {} calculations!", ledger.len());
    if !yes && !confirm("This action cannot be undone.")? {
        println!("Clear operation cancelled.");
        return Ok(());
    }

    let report = clear_with_backup(ledger, &config.backup_dir())?;
    println!("✓ Backup created: {}", report.backup_path.display());
    println!("✓ History cleared ({} calculations removed)", report.removed);
    warn_if_unsaved(ledger);
    Ok(())
}

fn print_entry(entry: &CalculationEntry) {
    println!("[{:>3}] {}", entry.id, entry.timestamp.format(TIMESTAMP_FORMAT));
    println!("      {}", entry.calculation);
    println!("      Type: {}", title_case(&entry.operation_type));
}

fn print_summary(summary: &SessionSummary) {
    if summary.calculations == 0 {
        println!("No calculations performed this session.");
        return;
    }

    println!("Session Summary:");
    println!("  • Calculations performed: {}", summary.calculations);
    println!(
        "  • Session duration: {}",
        format_duration(summary.elapsed.num_milliseconds() as f64 / 1000.0)
    );
    if let Some(most_used) = &summary.most_used {
        println!("  • Most used operation: {}", most_used);
    }
}

fn warn_if_unsaved(ledger: &Ledger) {
    if ledger.has_unsaved_changes() {
        eprintln!(
            "Warning: history could not be saved to {}",
            ledger.path().display()
        );
    }
}

/// Numeric value after the last '=' in a rendered calculation
fn parse_result(calculation: &str) -> Option<f64> {
    calculation
        .rsplit_once('=')
        .and_then(|(_, tail)| tail.trim().parse().ok())
}

fn confirm(message: &str) -> Result<bool> {
    println!("{}", message);
    print!("Are you sure you want to continue? (y/n): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
