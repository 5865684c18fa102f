//! Journal CLI
//!
//! Command-line interface for diffing snapshots and keeping journal histories

use clap::{Parser, Subcommand, ValueEnum};
use journal_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "journal")]
#[command(about = "Journal - versioned snapshots and human-readable change histories", long_about = None)]
struct Cli {
    /// Log output format on stderr; defaults to the config's logging profile
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Dev,
    /// JSON lines
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compare two snapshot files and print the changes
    Diff(commands::diff::DiffArgs),
    /// Record a snapshot file as the next version of a journable
    Record(commands::record::RecordArgs),
    /// Print the history of a journable
    History(commands::history::HistoryArgs),
}

fn main() {
    let cli = Cli::parse();

    // Commands fall back to the config's profile; only the first init counts
    match cli.log_format {
        Some(LogFormat::Dev) => logging_facility::init(Profile::Development),
        Some(LogFormat::Json) => logging_facility::init(Profile::Production),
        None => {}
    }

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Record(args) => commands::record::execute(args),
        Commands::History(args) => commands::history::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
