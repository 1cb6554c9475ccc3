//! One-shot full migration seeding the document store.

use std::collections::HashMap;

use anyhow::Result;
use mirai_sync_core::{TableSpec, TABLES};
use mirai_sync_storage::{row_to_source_row, DocSink, PgSource, SourceRow};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};

use crate::pager::Pager;
use crate::report::{MigrationReport, TableReport};

/// How many transformed documents a dry run shows per table.
const SAMPLE_SIZE: usize = 3;

/// Bulk-transfers every mapped table into the document store, parents
/// before children, building the `old_id → _id` map that reference
/// resolution depends on.
///
/// Writes are upserts keyed by `old_id`, so re-running the migrator is
/// safe: existing documents keep their `_id` and are overwritten in place
/// rather than duplicated.
pub struct FullMigrator {
    source: PgSource,
    sink: DocSink,
    batch_size: usize,
    dry_run: bool,
}

impl FullMigrator {
    pub fn new(source: PgSource, sink: DocSink, batch_size: usize, dry_run: bool) -> Self {
        Self { source, sink, batch_size, dry_run }
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport { dry_run: self.dry_run, ..MigrationReport::default() };
        let mut id_maps: HashMap<&'static str, HashMap<i64, Bson>> = HashMap::new();

        for spec in TABLES {
            let outcome = if self.dry_run {
                self.preview_table(spec).await
            } else {
                self.migrate_table(spec, &mut id_maps).await
            };
            match outcome {
                Ok(table_report) => report.tables.push(table_report),
                Err(err) => {
                    // A missing or unreadable table must not abort the run.
                    tracing::warn!(table = spec.table, "table migration failed, skipping: {err:#}");
                    report.tables.push(TableReport::failed(spec.table, spec.collection));
                },
            }
        }

        if !self.dry_run {
            if let Err(err) = self.sink.ensure_indexes().await {
                tracing::warn!("failed to create lookup indexes: {err:#}");
            }
        }
        Ok(report)
    }

    async fn migrate_table(
        &self,
        spec: &'static TableSpec,
        id_maps: &mut HashMap<&'static str, HashMap<i64, Bson>>,
    ) -> Result<TableReport> {
        let mut table_report = TableReport::new(spec.table, spec.collection);
        let mut id_map: HashMap<i64, Bson> = HashMap::new();
        let mut pager = Pager::new(self.batch_size);

        while let Some((limit, offset)) = pager.next_page() {
            let rows = self.source.fetch_page(spec.table, limit, offset).await?;
            pager.record_fetched(rows.len());

            for row in &rows {
                let source_row = row_to_source_row(spec, row)?;
                let old_id = source_row.old_id;
                let fields = resolve_refs(spec, source_row, id_maps, &mut table_report);
                table_report.read += 1;

                match self.sink.upsert(spec.collection, old_id, &fields).await {
                    Ok(Some(new_id)) => {
                        id_map.insert(old_id, new_id);
                        table_report.inserted += 1;
                    },
                    Ok(None) => {
                        // Row migrated by an earlier run; reuse its _id.
                        match self.sink.document_id_for(spec.collection, old_id).await? {
                            Some(existing) => {
                                id_map.insert(old_id, existing);
                            },
                            None => {
                                tracing::warn!(
                                    table = spec.table,
                                    old_id,
                                    "updated document vanished before id lookup"
                                );
                            },
                        }
                        table_report.updated += 1;
                    },
                    Err(err) => {
                        tracing::warn!(table = spec.table, old_id, "failed to write row: {err:#}");
                        table_report.skipped += 1;
                        table_report.failed = true;
                    },
                }
            }
        }

        id_maps.insert(spec.table, id_map);
        Ok(table_report)
    }

    /// Dry run: no writes. Counts come from `COUNT(*)`; the first few rows
    /// are transformed and kept as a shape sample, with parent references
    /// standing in as placeholder ids.
    async fn preview_table(&self, spec: &'static TableSpec) -> Result<TableReport> {
        let mut table_report = TableReport::new(spec.table, spec.collection);
        table_report.read = self.source.count_rows(spec.table).await? as u64;

        let rows = self.source.fetch_page(spec.table, SAMPLE_SIZE, 0).await?;
        for row in &rows {
            let source_row = row_to_source_row(spec, row)?;
            let mut sample = Document::new();
            sample.insert("old_id", Bson::Int64(source_row.old_id));
            let mut fields = source_row.fields;
            if let Some(parent) = spec.parent {
                let resolved = match source_row.parent_old_id {
                    Some(_) => Bson::ObjectId(ObjectId::new()),
                    None => Bson::Null,
                };
                fields.insert(parent.ref_field, resolved);
                fields.insert(
                    parent.old_id_field,
                    source_row.parent_old_id.map_or(Bson::Null, Bson::Int64),
                );
            }
            sample.extend(fields);
            table_report.sample.push(sample);
        }
        Ok(table_report)
    }
}

/// Add the reference fields for a child row. A FK whose parent is not in
/// the map resolves to an explicit null, never an omitted field.
fn resolve_refs(
    spec: &TableSpec,
    source_row: SourceRow,
    id_maps: &HashMap<&'static str, HashMap<i64, Bson>>,
    table_report: &mut TableReport,
) -> Document {
    let mut fields = source_row.fields;
    let Some(parent) = spec.parent else {
        return fields;
    };

    let resolved = source_row.parent_old_id.and_then(|parent_old_id| {
        id_maps.get(parent.parent_table).and_then(|map| map.get(&parent_old_id)).cloned()
    });
    if resolved.is_none() {
        if let Some(parent_old_id) = source_row.parent_old_id {
            tracing::warn!(
                table = spec.table,
                old_id = source_row.old_id,
                parent_table = parent.parent_table,
                parent_old_id,
                "parent not found, writing null reference"
            );
            table_report.null_refs += 1;
        }
    }
    fields.insert(parent.ref_field, resolved.unwrap_or(Bson::Null));
    fields.insert(parent.old_id_field, source_row.parent_old_id.map_or(Bson::Null, Bson::Int64));
    fields
}
