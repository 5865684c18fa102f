//! Noop classification for history display

use crate::diff::model::ChangeSet;

/// A note is blank when absent or whitespace only
pub fn is_blank_note(note: Option<&str>) -> bool {
    note.map_or(true, |n| n.trim().is_empty())
}

/// A snapshot is noop when nothing changed and nothing was said.
///
/// Noop snapshots are still stored; this only decides whether the default
/// timeline shows them.
pub fn is_noop(changes: &ChangeSet, note: Option<&str>) -> bool {
    changes.is_empty() && is_blank_note(note)
}
