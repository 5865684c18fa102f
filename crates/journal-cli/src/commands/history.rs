//! History command
//!
//! Usage: journal history --type <TYPE> --id <ID> [--all]

use super::{load_config, render_lines, CommandResult};
use clap::Args;
use journal_core::journal::JournalRepository;
use journal_core::model::JournableRef;
use journal_store::SqliteJournalStore;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long = "type")]
    pub journable_type: String,

    #[arg(long)]
    pub id: String,

    /// Include versions that changed nothing
    #[arg(long)]
    pub all: bool,

    #[arg(long, default_value = "journal.toml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".journal/journal.db")]
    pub db: PathBuf,
}

pub fn execute(args: HistoryArgs) -> CommandResult {
    let config = load_config(&args.config)?;
    let spec = config.spec_for(&args.journable_type)?;
    let journable = JournableRef::new(args.journable_type.clone(), args.id.clone());

    if !args.db.exists() {
        return Err(format!("no journal database at {}", args.db.display()).into());
    }
    let store = SqliteJournalStore::open(&args.db)?;
    let history = store.history(&journable, args.all)?;

    if history.is_empty() {
        println!("No history for {}", journable);
        return Ok(());
    }

    for entry in history {
        let snapshot = entry.snapshot();
        let mut header = format!(
            "Version {} ({})",
            entry.version(),
            snapshot.created_at().format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(author) = snapshot.author() {
            header.push_str(&format!(" by {}", author));
        }
        println!("{}", header);

        if let Some(note) = snapshot.note().filter(|n| !n.trim().is_empty()) {
            println!("  Note: {}", note);
        }
        for line in render_lines(entry.changes(), &config, spec, &journable)? {
            println!("  - {}", line);
        }
    }
    Ok(())
}
