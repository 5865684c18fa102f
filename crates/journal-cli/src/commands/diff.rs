//! Diff command
//!
//! Usage: journal diff [--old <FILE>] --new <FILE> --type <TYPE> [--json]

use super::{load_config, read_draft, render_lines, CommandResult};
use clap::Args;
use journal_core::model::{JournableRef, Snapshot};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Earlier snapshot; omit to diff against nothing
    #[arg(long)]
    pub old: Option<PathBuf>,

    /// Later snapshot
    #[arg(long)]
    pub new: PathBuf,

    /// Journable type whose diff spec applies
    #[arg(long = "type")]
    pub journable_type: String,

    /// Journable id, used as the reference scope
    #[arg(long, default_value = "0")]
    pub id: String,

    #[arg(long, default_value = "journal.toml")]
    pub config: PathBuf,

    /// Print the change set as JSON instead of sentences
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: DiffArgs) -> CommandResult {
    let config = load_config(&args.config)?;
    let spec = config.spec_for(&args.journable_type)?;
    let journable = JournableRef::new(args.journable_type.clone(), args.id.clone());
    let now = chrono::Utc::now();

    let old = args
        .old
        .as_deref()
        .map(|path| read_draft(path, journable.clone()))
        .transpose()?
        .map(|draft| Snapshot::from_draft(spec.coerce_draft(draft), 1, now));
    let new_version = if old.is_some() { 2 } else { 1 };
    let new = Snapshot::from_draft(
        spec.coerce_draft(read_draft(&args.new, journable.clone())?),
        new_version,
        now,
    );

    let changes = spec.compute(old.as_ref(), &new)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No changes");
        return Ok(());
    }
    for line in render_lines(&changes, &config, spec, &journable)? {
        println!("{}", line);
    }
    Ok(())
}
