//! Store clients for mirai-sync
//!
//! `PgSource` reads the relational source of truth (and carries the two
//! backfill repairs, the only writes this pipeline ever makes to Postgres).
//! `DocSink` writes the document store. `watermark` owns the sync watermark
//! and the lease lock, both living in the `migration_meta` collection.

mod sink;
mod source;
mod transform;
pub mod watermark;

pub use sink::DocSink;
pub use source::PgSource;
pub use transform::{SourceRow, row_to_source_row, upsert_filter, upsert_update};
