//! Row→document transformation driven by the shared table mapping.

use anyhow::Result;
use chrono::{DateTime, Utc};
use mirai_sync_core::{ColumnSpec, FieldKind, TableSpec};
use mongodb::bson::{doc, Bson, Document};
use sqlx::postgres::PgRow;
use sqlx::Row;

/// A relational row decoded into its document projection, before reference
/// resolution.
#[derive(Debug, Clone)]
pub struct SourceRow {
    /// The relational primary key, kept on the document as `old_id`.
    pub old_id: i64,
    /// Raw FK value for child tables, `None` for root tables or null FKs.
    pub parent_old_id: Option<i64>,
    /// The mapped data fields. Reference fields are added by the caller
    /// once the parent id is resolved.
    pub fields: Document,
}

/// Decode one row according to its table's projection. Every mapped column
/// becomes a field; SQL NULL becomes an explicit `Bson::Null`.
pub fn row_to_source_row(spec: &TableSpec, row: &PgRow) -> Result<SourceRow> {
    let old_id: i64 = row.try_get("id")?;
    let parent_old_id = match spec.parent {
        Some(parent) => row.try_get::<Option<i64>, _>(parent.column)?,
        None => None,
    };
    let mut fields = Document::new();
    for column in spec.columns {
        fields.insert(column.field, decode_column(row, column)?);
    }
    Ok(SourceRow { old_id, parent_old_id, fields })
}

fn decode_column(row: &PgRow, column: &ColumnSpec) -> Result<Bson> {
    let value = match column.kind {
        FieldKind::Text => row.try_get::<Option<String>, _>(column.column)?.map(Bson::String),
        FieldKind::Int => row.try_get::<Option<i64>, _>(column.column)?.map(Bson::Int64),
        FieldKind::Bool => row.try_get::<Option<bool>, _>(column.column)?.map(Bson::Boolean),
        FieldKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(column.column)?
            .map(|dt| Bson::DateTime(mongodb::bson::DateTime::from_chrono(dt))),
    };
    Ok(value.unwrap_or(Bson::Null))
}

/// Filter selecting the document for a given relational row.
pub fn upsert_filter(old_id: i64) -> Document {
    doc! { "old_id": old_id }
}

/// Update document for an upsert keyed by `old_id`.
///
/// `old_id` lives only under `$setOnInsert`: it is written exactly once and
/// an existing document's join key can never be overwritten.
pub fn upsert_update(old_id: i64, fields: &Document) -> Document {
    doc! {
        "$set": fields.clone(),
        "$setOnInsert": { "old_id": old_id },
    }
}
