//! Journal Store - SQLite persistence for journal histories
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - [`SqliteJournalStore`], a `JournalRepository` that assigns versions
//!   and stores snapshots with their change sets atomically

#![allow(clippy::result_large_err)]

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::SqliteJournalStore;
