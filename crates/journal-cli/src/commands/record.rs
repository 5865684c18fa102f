//! Record command
//!
//! Usage: journal record --type <TYPE> --id <ID> --snapshot <FILE> [--note <TEXT>]

use super::{load_config, read_draft, CommandResult};
use clap::Args;
use journal_core::journal::JournalRepository;
use journal_core::model::JournableRef;
use journal_core_types::RequestContext;
use journal_store::SqliteJournalStore;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[arg(long = "type")]
    pub journable_type: String,

    #[arg(long)]
    pub id: String,

    /// Snapshot file holding the journable's current state
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Note stored with this version; overrides one in the snapshot file
    #[arg(long)]
    pub note: Option<String>,

    /// Who made the change
    #[arg(long)]
    pub author: Option<String>,

    #[arg(long, default_value = "journal.toml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".journal/journal.db")]
    pub db: PathBuf,
}

pub fn execute(args: RecordArgs) -> CommandResult {
    let config = load_config(&args.config)?;
    let spec = config.spec_for(&args.journable_type)?;
    let journable = JournableRef::new(args.journable_type.clone(), args.id.clone());

    let mut draft = read_draft(&args.snapshot, journable)?;
    if let Some(note) = args.note {
        draft = draft.note(note);
    }

    let mut ctx = RequestContext::new();
    if let Some(author) = args.author {
        ctx = ctx.with_actor(author);
    }

    if let Some(parent) = args.db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut store = SqliteJournalStore::open(&args.db)?;
    let entry = store.record(draft, spec, &ctx)?;

    println!(
        "Recorded {} version {} ({} change{}){}",
        entry.snapshot().journable(),
        entry.version(),
        entry.changes().len(),
        if entry.changes().len() == 1 { "" } else { "s" },
        if entry.is_noop() { " [noop]" } else { "" }
    );
    Ok(())
}
