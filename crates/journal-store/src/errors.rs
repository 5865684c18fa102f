//! Error handling for journal-store
//!
//! Wraps journal-core JournalError with store-specific helpers

use journal_core::errors::{JournalError, JournalErrorKind};
use journal_core::model::JournableRef;

/// Result type alias using JournalError
pub type Result<T> = std::result::Result<T, JournalError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> JournalError {
    JournalError::new(JournalErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> JournalError {
    JournalError::new(JournalErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Another writer stored `version` of `journable` first
pub fn version_conflict(journable: &JournableRef, version: u32) -> JournalError {
    JournalError::new(JournalErrorKind::VersionConflict)
        .with_op("store_record")
        .with_journable(journable.to_string())
        .with_version(version)
        .with_message("version already recorded by a concurrent writer")
}

/// A stored row could not be decoded
pub fn corrupt_row(op: &str, journable: &JournableRef, reason: impl std::fmt::Display) -> JournalError {
    JournalError::new(JournalErrorKind::Serialization)
        .with_op(op.to_string())
        .with_journable(journable.to_string())
        .with_message(format!("Stored journal row is unreadable: {}", reason))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> JournalError {
    JournalError::new(JournalErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Whether `err` is a UNIQUE or PRIMARY KEY violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}
