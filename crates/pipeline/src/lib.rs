//! Orchestration layer for mirai-sync
//!
//! `FullMigrator` seeds the document store once; `IncrementalSyncer` keeps
//! it current afterwards. Both consume the shared table mapping from
//! `mirai-sync-core` and the store clients from `mirai-sync-storage`.

mod full;
mod incremental;
mod pager;
mod report;

pub use full::FullMigrator;
pub use incremental::IncrementalSyncer;
pub use report::{MigrationReport, SyncReport, TableReport};
