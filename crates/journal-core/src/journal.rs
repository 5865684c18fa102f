//! Journal history: the ordered snapshots of one journable with their
//! derived change sets.
//!
//! [`next_entry`] is the one step every backend runs when a mutation is
//! recorded: assign the next version, freeze the draft, diff it against the
//! predecessor and classify it. Callers must serialize writers of the same
//! journable around it; the in-memory [`Journal`] does so through `&mut
//! self`, the SQLite store through an immediate transaction.

use crate::diff::model::ChangeSet;
use crate::diff::spec::DiffSpec;
use crate::errors::{DiffError, JournalError, Result};
use crate::model::{JournableRef, Snapshot, SnapshotDraft};
use crate::noop::is_noop;
use crate::{log_op_end, log_op_error, log_op_start};
use chrono::{DateTime, Utc};
use journal_core_types::RequestContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A snapshot together with the changes that led to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    snapshot: Snapshot,
    changes: ChangeSet,
    noop: bool,
}

impl JournalEntry {
    /// Pair a snapshot with its stored change set, re-deriving the noop flag
    pub fn from_parts(snapshot: Snapshot, changes: ChangeSet) -> Self {
        let noop = is_noop(&changes, snapshot.note());
        Self {
            snapshot,
            changes,
            noop,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn version(&self) -> u32 {
        self.snapshot.version()
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }
}

/// Build the entry that follows `previous`.
///
/// # Errors
///
/// - `JournableMismatch` when the draft is for another journable
/// - `NonMonotonicVersion` when `previous` already holds the last version
/// - any error of [`DiffSpec::compute`]
pub fn next_entry(
    previous: Option<&Snapshot>,
    draft: SnapshotDraft,
    spec: &DiffSpec,
    created_at: DateTime<Utc>,
) -> Result<JournalEntry> {
    let version = match previous {
        None => 1,
        Some(prev) => {
            if prev.journable() != &draft.journable {
                return Err(DiffError::JournableMismatch {
                    expected: prev.journable().to_string(),
                    actual: draft.journable.to_string(),
                });
            }
            prev.version()
                .checked_add(1)
                .ok_or_else(|| DiffError::NonMonotonicVersion {
                    journable: prev.journable().to_string(),
                    previous: prev.version(),
                    next: prev.version(),
                })?
        }
    };

    let snapshot = Snapshot::from_draft(spec.coerce_draft(draft), version, created_at);
    let changes = spec.compute(previous, &snapshot)?;
    Ok(JournalEntry::from_parts(snapshot, changes))
}

/// Fill in the draft's author from the request when it has none
pub fn stamp_author(draft: SnapshotDraft, ctx: &RequestContext) -> SnapshotDraft {
    match (&draft.author, &ctx.actor) {
        (None, Some(actor)) => draft.author(actor.clone()),
        _ => draft,
    }
}

/// In-memory history of one journable
#[derive(Debug, Clone)]
pub struct Journal {
    journable: JournableRef,
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new(journable: JournableRef) -> Self {
        Self {
            journable,
            entries: Vec::new(),
        }
    }

    pub fn journable(&self) -> &JournableRef {
        &self.journable
    }

    /// Record `draft` as the next version, stamped now
    ///
    /// # Errors
    ///
    /// See [`next_entry`].
    pub fn record(&mut self, draft: SnapshotDraft, spec: &DiffSpec) -> Result<&JournalEntry> {
        self.record_at(draft, spec, Utc::now())
    }

    /// Record `draft` as the next version with an explicit timestamp
    ///
    /// # Errors
    ///
    /// See [`next_entry`].
    pub fn record_at(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        created_at: DateTime<Utc>,
    ) -> Result<&JournalEntry> {
        let op = "journal_record";
        log_op_start!(op, journable = %self.journable);
        let start = std::time::Instant::now();

        let entry = next_entry(self.latest().map(JournalEntry::snapshot), draft, spec, created_at)
            .and_then(|entry| {
                self.check_successor(entry.snapshot())?;
                Ok(entry)
            })
            .map_err(|e| {
                log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                e
            })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            version = entry.version(),
            change_count = entry.changes().len(),
            noop = entry.is_noop()
        );
        let index = self.entries.len();
        self.entries.push(entry);
        Ok(&self.entries[index])
    }

    /// Append an entry built elsewhere (e.g. loaded from storage)
    ///
    /// # Errors
    ///
    /// `JournableMismatch` or `NonMonotonicVersion` if the entry does not
    /// directly follow the current latest entry.
    pub fn append(&mut self, entry: JournalEntry) -> Result<()> {
        self.check_successor(entry.snapshot())?;
        self.entries.push(entry);
        Ok(())
    }

    fn check_successor(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.journable() != &self.journable {
            return Err(DiffError::JournableMismatch {
                expected: self.journable.to_string(),
                actual: snapshot.journable().to_string(),
            });
        }
        let previous = self.latest().map_or(0, JournalEntry::version);
        if Some(snapshot.version()) != previous.checked_add(1) {
            return Err(DiffError::NonMonotonicVersion {
                journable: self.journable.to_string(),
                previous,
                next: snapshot.version(),
            });
        }
        Ok(())
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    pub fn entry(&self, version: u32) -> Option<&JournalEntry> {
        // Versions are dense from 1, so the index is version - 1
        let index = usize::try_from(version.checked_sub(1)?).ok()?;
        self.entries.get(index)
    }

    /// Entries in version order; noop entries only when asked for
    pub fn timeline(&self, include_noop: bool) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .iter()
            .filter(move |entry| include_noop || !entry.is_noop())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistence seam for journal histories
pub trait JournalRepository {
    /// Record `draft` as the next version of its journable.
    ///
    /// Version assignment, diffing and storage happen as one unit: either
    /// the entry is stored with a fresh version or nothing is.
    ///
    /// # Errors
    ///
    /// Diff configuration errors, `ERR_VERSION_CONFLICT` on a lost race,
    /// and backend failures.
    fn record(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        ctx: &RequestContext,
    ) -> std::result::Result<JournalEntry, JournalError>;

    /// All entries of a journable in version order
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn history(
        &self,
        journable: &JournableRef,
        include_noop: bool,
    ) -> std::result::Result<Vec<JournalEntry>, JournalError>;

    /// One version of a journable, if it exists
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn load(
        &self,
        journable: &JournableRef,
        version: u32,
    ) -> std::result::Result<Option<JournalEntry>, JournalError>;
}

/// [`JournalRepository`] over in-memory [`Journal`]s
#[derive(Debug, Default)]
pub struct InMemoryJournals {
    journals: HashMap<JournableRef, Journal>,
}

impl InMemoryJournals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self, journable: &JournableRef) -> Option<&Journal> {
        self.journals.get(journable)
    }
}

impl JournalRepository for InMemoryJournals {
    fn record(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        ctx: &RequestContext,
    ) -> std::result::Result<JournalEntry, JournalError> {
        let draft = stamp_author(draft, ctx);
        let journal = self
            .journals
            .entry(draft.journable.clone())
            .or_insert_with(|| Journal::new(draft.journable.clone()));

        journal.record(draft, spec).cloned().map_err(|e| {
            let mut err = JournalError::from(e)
                .with_op("journal_record")
                .with_request_id(ctx.request_id.clone());
            if let Some(trace_id) = &ctx.trace_id {
                err = err.with_trace_id(trace_id.clone());
            }
            err
        })
    }

    fn history(
        &self,
        journable: &JournableRef,
        include_noop: bool,
    ) -> std::result::Result<Vec<JournalEntry>, JournalError> {
        Ok(self
            .journals
            .get(journable)
            .map(|journal| journal.timeline(include_noop).cloned().collect())
            .unwrap_or_default())
    }

    fn load(
        &self,
        journable: &JournableRef,
        version: u32,
    ) -> std::result::Result<Option<JournalEntry>, JournalError> {
        Ok(self
            .journals
            .get(journable)
            .and_then(|journal| journal.entry(version))
            .cloned())
    }
}
