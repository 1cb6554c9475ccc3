//! Declarative table→collection mapping shared by the full migrator and the
//! incremental syncer.
//!
//! Both components must agree on document shape; keeping the projection in
//! one place is what guarantees that. `TABLES` is ordered parents-first so
//! that reference resolution always finds the parent map already populated.

/// How a relational column is coerced into a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Bool,
    Timestamp,
}

/// One projected column: relational name, document field name, coercion.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub field: &'static str,
    pub kind: FieldKind,
}

/// A foreign key to a parent table and the document fields it produces.
///
/// `ref_field` carries the parent's generated document id (or null when the
/// parent is missing); `old_id_field` carries the raw relational key so
/// readers can always join back to the source of truth.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub ref_field: &'static str,
    pub old_id_field: &'static str,
}

/// Full projection for one migrated table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: &'static str,
    pub collection: &'static str,
    pub columns: &'static [ColumnSpec],
    pub parent: Option<ParentRef>,
}

const fn col(column: &'static str, field: &'static str, kind: FieldKind) -> ColumnSpec {
    ColumnSpec { column, field, kind }
}

/// The five migrated tables, in dependency order (parents before children).
pub const TABLES: &[TableSpec] = &[
    TableSpec {
        table: "modules",
        collection: "modules",
        columns: &[
            col("title", "title", FieldKind::Text),
            col("description", "description", FieldKind::Text),
            col("sort_order", "sort_order", FieldKind::Int),
            col("created_at", "created_at", FieldKind::Timestamp),
            col("updated_at", "updated_at", FieldKind::Timestamp),
        ],
        parent: None,
    },
    TableSpec {
        table: "module_lessons",
        collection: "lessons",
        columns: &[
            col("title", "title", FieldKind::Text),
            col("summary", "summary", FieldKind::Text),
            col("sort_order", "sort_order", FieldKind::Int),
            col("is_free", "is_free", FieldKind::Bool),
            col("created_at", "created_at", FieldKind::Timestamp),
            col("updated_at", "updated_at", FieldKind::Timestamp),
        ],
        parent: Some(ParentRef {
            column: "module_id",
            parent_table: "modules",
            ref_field: "module_ref",
            old_id_field: "module_old_id",
        }),
    },
    TableSpec {
        table: "lesson_videos",
        collection: "videos",
        columns: &[
            col("title", "title", FieldKind::Text),
            col("url", "url", FieldKind::Text),
            col("duration_seconds", "duration_seconds", FieldKind::Int),
            col("order_index", "order_index", FieldKind::Int),
            col("created_at", "created_at", FieldKind::Timestamp),
            col("updated_at", "updated_at", FieldKind::Timestamp),
        ],
        parent: Some(ParentRef {
            column: "lesson_id",
            parent_table: "module_lessons",
            ref_field: "lesson_ref",
            old_id_field: "lesson_old_id",
        }),
    },
    TableSpec {
        table: "lesson_progress",
        collection: "lesson_progress",
        columns: &[
            col("student_id", "student_id", FieldKind::Text),
            col("status", "status", FieldKind::Text),
            col("completed_at", "completed_at", FieldKind::Timestamp),
            col("created_at", "created_at", FieldKind::Timestamp),
            col("updated_at", "updated_at", FieldKind::Timestamp),
        ],
        parent: Some(ParentRef {
            column: "lesson_id",
            parent_table: "module_lessons",
            ref_field: "lesson_ref",
            old_id_field: "lesson_old_id",
        }),
    },
    TableSpec {
        table: "user_roles",
        collection: "user_roles",
        columns: &[
            col("user_id", "user_id", FieldKind::Text),
            col("role", "role", FieldKind::Text),
            col("created_at", "created_at", FieldKind::Timestamp),
            col("updated_at", "updated_at", FieldKind::Timestamp),
        ],
        parent: None,
    },
];

/// Look up a table spec by relational table name.
pub fn spec_for_table(table: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|s| s.table == table)
}
