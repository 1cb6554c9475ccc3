//! Run reports for the migrator and the syncer.

use chrono::{DateTime, Utc};
use mongodb::bson::Document;

/// Per-table outcome of a migration or sync pass.
#[derive(Debug, Clone, Default)]
pub struct TableReport {
    pub table: &'static str,
    pub collection: &'static str,
    /// Rows seen (for a dry run: the unfiltered table count).
    pub read: u64,
    pub inserted: u64,
    pub updated: u64,
    /// Rows that failed to write and were left behind.
    pub skipped: u64,
    /// Child rows whose parent could not be found (reference set to null).
    pub null_refs: u64,
    /// First few transformed documents, populated only on a dry run.
    pub sample: Vec<Document>,
    /// True when the table aborted early or lost rows; pins the sync
    /// watermark so the window is retried.
    pub failed: bool,
}

impl TableReport {
    pub(crate) fn new(table: &'static str, collection: &'static str) -> Self {
        Self { table, collection, ..Self::default() }
    }

    pub(crate) fn failed(table: &'static str, collection: &'static str) -> Self {
        Self { table, collection, failed: true, ..Self::default() }
    }
}

/// Outcome of one `FullMigrator` run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn all_clean(&self) -> bool {
        self.tables.iter().all(|t| !t.failed)
    }
}

/// Outcome of one `IncrementalSyncer` run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Watermark the run read, i.e. the lower bound of the sync window.
    pub since: DateTime<Utc>,
    /// Wall-clock time captured at the start of the run.
    pub run_started: DateTime<Utc>,
    pub tables: Vec<TableReport>,
    /// Whether the watermark was advanced to `run_started`.
    pub watermark_advanced: bool,
}

impl SyncReport {
    pub fn all_clean(&self) -> bool {
        self.tables.iter().all(|t| !t.failed)
    }

    pub fn total_upserts(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted + t.updated).sum()
    }
}
