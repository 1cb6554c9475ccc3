//! Watermark-driven incremental sync.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use mirai_sync_core::{spec_for_table, SyncError, TableSpec, TABLES};
use mirai_sync_storage::{row_to_source_row, watermark, DocSink, PgSource};
use mongodb::bson::Bson;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::pager::Pager;
use crate::report::{SyncReport, TableReport};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Old-id keyed cache of parent `_id` lookups, per run.
type RefCache = HashMap<(&'static str, i64), Option<Bson>>;

/// Propagates rows changed since the persisted watermark, upserting each by
/// `old_id` so re-runs over unchanged rows are no-ops.
///
/// The watermark only advances to the run's start time when every table
/// completed cleanly; a failed batch pins it so the window is retried on
/// the next pass instead of being silently skipped. Exactly one run may
/// advance the watermark at a time, enforced by a lease in
/// `migration_meta`.
pub struct IncrementalSyncer {
    source: PgSource,
    sink: DocSink,
    batch_size: usize,
    max_retries: u32,
}

impl IncrementalSyncer {
    pub fn new(source: PgSource, sink: DocSink, batch_size: usize, max_retries: u32) -> Self {
        Self { source, sink, batch_size, max_retries }
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let holder = Uuid::new_v4().to_string();
        if !watermark::acquire_lease(&self.sink, &holder).await? {
            return Err(SyncError::LeaseHeld(
                "an unexpired sync lease exists in migration_meta".to_owned(),
            )
            .into());
        }
        let result = self.run_leased().await;
        if let Err(err) = watermark::release_lease(&self.sink, &holder).await {
            tracing::warn!("failed to release sync lease: {err:#}");
        }
        result
    }

    async fn run_leased(&self) -> Result<SyncReport> {
        let run_started = Utc::now();
        let since = watermark::load_watermark(&self.sink).await?;
        tracing::info!(since = %since.to_rfc3339(), "sync window opened");

        let mut tables = Vec::with_capacity(TABLES.len());
        let mut ref_cache = RefCache::new();
        for spec in TABLES {
            tables.push(self.sync_table(spec, since, &mut ref_cache).await);
        }

        let mut report =
            SyncReport { since, run_started, tables, watermark_advanced: false };
        if report.all_clean() {
            watermark::store_watermark(&self.sink, next_watermark(since, run_started)).await?;
            report.watermark_advanced = true;
        } else {
            tracing::warn!(
                watermark = %since.to_rfc3339(),
                "tables failed this run, watermark not advanced so the window is retried"
            );
        }
        Ok(report)
    }

    async fn sync_table(
        &self,
        spec: &'static TableSpec,
        since: DateTime<Utc>,
        ref_cache: &mut RefCache,
    ) -> TableReport {
        let mut table_report = TableReport::new(spec.table, spec.collection);
        let mut pager = Pager::new(self.batch_size);

        while let Some((limit, offset)) = pager.next_page() {
            let rows = match self.fetch_with_retry(spec.table, since, limit, offset).await {
                Ok(rows) => rows,
                Err(err) => {
                    tracing::warn!(
                        table = spec.table,
                        offset,
                        "page fetch failed after retries, abandoning table: {err:#}"
                    );
                    table_report.failed = true;
                    break;
                },
            };
            pager.record_fetched(rows.len());

            for row in &rows {
                table_report.read += 1;
                match self.sync_row(spec, row, ref_cache, &mut table_report).await {
                    Ok(true) => table_report.inserted += 1,
                    Ok(false) => table_report.updated += 1,
                    Err(err) => {
                        tracing::warn!(table = spec.table, "failed to sync row: {err:#}");
                        table_report.skipped += 1;
                        table_report.failed = true;
                    },
                }
            }
        }
        table_report
    }

    /// Upsert one changed row; returns whether a new document was created.
    async fn sync_row(
        &self,
        spec: &'static TableSpec,
        row: &PgRow,
        ref_cache: &mut RefCache,
        table_report: &mut TableReport,
    ) -> Result<bool> {
        let source_row = row_to_source_row(spec, row)?;
        let mut fields = source_row.fields;

        if let Some(parent) = spec.parent {
            let resolved = match source_row.parent_old_id {
                Some(parent_old_id) => {
                    let found = self.resolve_parent(parent.parent_table, parent_old_id, ref_cache).await?;
                    if found.is_none() {
                        tracing::warn!(
                            table = spec.table,
                            old_id = source_row.old_id,
                            parent_table = parent.parent_table,
                            parent_old_id,
                            "parent not found, writing null reference"
                        );
                        table_report.null_refs += 1;
                    }
                    found
                },
                None => None,
            };
            fields.insert(parent.ref_field, resolved.unwrap_or(Bson::Null));
            fields.insert(
                parent.old_id_field,
                source_row.parent_old_id.map_or(Bson::Null, Bson::Int64),
            );
        }

        let upserted = self.sink.upsert(spec.collection, source_row.old_id, &fields).await?;
        Ok(upserted.is_some())
    }

    /// Resolve a parent's document id via its `old_id` index, memoized for
    /// the run. Misses are cached too: an absent parent stays absent for
    /// the duration of a pass.
    async fn resolve_parent(
        &self,
        parent_table: &'static str,
        parent_old_id: i64,
        ref_cache: &mut RefCache,
    ) -> Result<Option<Bson>> {
        if let Some(cached) = ref_cache.get(&(parent_table, parent_old_id)) {
            return Ok(cached.clone());
        }
        let parent_spec = spec_for_table(parent_table)
            .ok_or_else(|| SyncError::UnknownTable(parent_table.to_owned()))?;
        let found = self.sink.document_id_for(parent_spec.collection, parent_old_id).await?;
        ref_cache.insert((parent_table, parent_old_id), found.clone());
        Ok(found)
    }

    async fn fetch_with_retry(
        &self,
        table: &str,
        since: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PgRow>> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_changed_page(table, since, limit, offset).await {
                Ok(rows) => return Ok(rows),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        table,
                        offset,
                        attempt,
                        max_retries = self.max_retries,
                        "page fetch failed, retrying: {err:#}"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

/// The watermark never moves backward, even under clock skew between runs.
fn next_watermark(previous: DateTime<Utc>, run_started: DateTime<Utc>) -> DateTime<Utc> {
    previous.max(run_started)
}
