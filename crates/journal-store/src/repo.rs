//! SQLite-backed journal history
//!
//! Each recorded version is one `journals` row holding the frozen snapshot
//! as JSON, plus one `journal_changes` row per change key.

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, is_unique_violation, version_conflict, Result};
use crate::migrations::apply_migrations;
use chrono::{DateTime, Utc};
use journal_core::diff::{ChangeEntry, ChangeSet, ChangeValue, DiffSpec};
use journal_core::errors::JournalError;
use journal_core::journal::{next_entry, stamp_author, JournalEntry, JournalRepository};
use journal_core::model::{JournableRef, Snapshot, SnapshotDraft};
use journal_core::{log_op_end, log_op_error, log_op_start};
use journal_core_types::RequestContext;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;

/// Journal histories in a SQLite database
pub struct SqliteJournalStore {
    conn: Connection,
}

impl SqliteJournalStore {
    /// Open (creating if needed) and migrate the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Record `draft` with an explicit timestamp
    ///
    /// The predecessor is read and the new rows written inside one
    /// `BEGIN IMMEDIATE` transaction, so writers of the same database are
    /// serialized. A concurrent writer that slipped in anyway surfaces as
    /// `ERR_VERSION_CONFLICT` and nothing is stored.
    pub fn record_at(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        ctx: &RequestContext,
        created_at: DateTime<Utc>,
    ) -> Result<JournalEntry> {
        let op = "store_record";
        let journable = draft.journable.clone();
        log_op_start!(op, journable = %journable, request_id = %ctx.request_id);
        let start = std::time::Instant::now();

        let result = self.record_in_transaction(stamp_author(draft, ctx), spec, ctx, created_at);
        let entry = result.map_err(|e| {
            let mut err = e.with_request_id(ctx.request_id.clone());
            if let Some(trace_id) = &ctx.trace_id {
                err = err.with_trace_id(trace_id.clone());
            }
            log_op_error!(op, err.clone(), duration_ms = start.elapsed().as_millis() as u64);
            err
        })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            version = entry.version(),
            change_count = entry.changes().len(),
            noop = entry.is_noop()
        );
        Ok(entry)
    }

    fn record_in_transaction(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        ctx: &RequestContext,
        created_at: DateTime<Utc>,
    ) -> Result<JournalEntry> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        let previous = latest_snapshot(&tx, &draft.journable)?;
        let entry = next_entry(previous.as_ref(), draft, spec, created_at)
            .map_err(|e| JournalError::from(e).with_op("store_record"))?;

        insert_entry(&tx, &entry, ctx)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(entry)
    }

    /// Number of versions stored for `journable`, noop entries included
    pub fn version_count(&self, journable: &JournableRef) -> Result<u32> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM journals WHERE journable_type = ?1 AND journable_id = ?2",
                rusqlite::params![journable.journable_type, journable.journable_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)
    }
}

impl JournalRepository for SqliteJournalStore {
    fn record(
        &mut self,
        draft: SnapshotDraft,
        spec: &DiffSpec,
        ctx: &RequestContext,
    ) -> Result<JournalEntry> {
        self.record_at(draft, spec, ctx, Utc::now())
    }

    fn history(&self, journable: &JournableRef, include_noop: bool) -> Result<Vec<JournalEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, snapshot_json FROM journals
                 WHERE journable_type = ?1 AND journable_id = ?2 AND (?3 OR noop = 0)
                 ORDER BY version",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![journable.journable_type, journable.journable_id, include_noop],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(id, json)| hydrate(&self.conn, journable, id, &json))
            .collect()
    }

    fn load(&self, journable: &JournableRef, version: u32) -> Result<Option<JournalEntry>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, snapshot_json FROM journals
                 WHERE journable_type = ?1 AND journable_id = ?2 AND version = ?3",
                rusqlite::params![journable.journable_type, journable.journable_id, version],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        row.map(|(id, json)| hydrate(&self.conn, journable, id, &json))
            .transpose()
    }
}

fn latest_snapshot(tx: &Transaction<'_>, journable: &JournableRef) -> Result<Option<Snapshot>> {
    let json: Option<String> = tx
        .query_row(
            "SELECT snapshot_json FROM journals
             WHERE journable_type = ?1 AND journable_id = ?2
             ORDER BY version DESC LIMIT 1",
            rusqlite::params![journable.journable_type, journable.journable_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    json.map(|json| {
        serde_json::from_str(&json).map_err(|e| corrupt_row("store_record", journable, e))
    })
    .transpose()
}

/// Write the rows for `entry`
pub(crate) fn insert_entry(
    tx: &Transaction<'_>,
    entry: &JournalEntry,
    ctx: &RequestContext,
) -> Result<()> {
    let snapshot = entry.snapshot();
    let journable = snapshot.journable();
    let snapshot_json =
        serde_json::to_string(snapshot).map_err(|e| corrupt_row("store_record", journable, e))?;

    tx.execute(
        "INSERT INTO journals (journable_type, journable_id, version, snapshot_json, note, author,
                               noop, created_at, request_id, trace_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            journable.journable_type,
            journable.journable_id,
            snapshot.version(),
            snapshot_json,
            snapshot.note(),
            snapshot.author(),
            entry.is_noop(),
            snapshot.created_at().to_rfc3339(),
            ctx.request_id.as_str(),
            ctx.trace_id.as_ref().map(|t| t.as_str()),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            version_conflict(journable, snapshot.version())
        } else {
            from_rusqlite(e)
        }
    })?;
    let journal_id = tx.last_insert_rowid();

    let mut stmt = tx
        .prepare(
            "INSERT INTO journal_changes (journal_id, change_key, old_json, new_json)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(from_rusqlite)?;
    for change in entry.changes() {
        let encode = |side: Option<&ChangeValue>| {
            side.map(serde_json::to_string)
                .transpose()
                .map_err(|e| corrupt_row("store_record", journable, e))
        };
        stmt.execute(rusqlite::params![
            journal_id,
            change.key(),
            encode(change.old())?,
            encode(change.new_value())?,
        ])
        .map_err(from_rusqlite)?;
    }

    Ok(())
}

fn hydrate(
    conn: &Connection,
    journable: &JournableRef,
    journal_id: i64,
    snapshot_json: &str,
) -> Result<JournalEntry> {
    let snapshot: Snapshot =
        serde_json::from_str(snapshot_json).map_err(|e| corrupt_row("hydrate", journable, e))?;

    let mut stmt = conn
        .prepare(
            "SELECT change_key, old_json, new_json FROM journal_changes
             WHERE journal_id = ?1 ORDER BY change_key",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([journal_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    let decode = |side: Option<String>| -> Result<Option<ChangeValue>> {
        side.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| corrupt_row("hydrate", journable, e))
    };

    let mut changes = ChangeSet::new();
    for (key, old, new) in rows {
        let entry = ChangeEntry::new(key.clone(), decode(old)?, decode(new)?).ok_or_else(|| {
            corrupt_row("hydrate", journable, format!("change '{}' has equal sides", key))
        })?;
        changes
            .insert(entry)
            .map_err(|e| JournalError::from(e).with_op("hydrate"))?;
    }

    Ok(JournalEntry::from_parts(snapshot, changes))
}
