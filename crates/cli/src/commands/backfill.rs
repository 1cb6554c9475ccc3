//! One-off relational repairs. Neither touches the document store.

use mirai_sync_core::Config;
use mirai_sync_storage::PgSource;

/// Seed a `not_started` progress row for every (student, lesson) pair that
/// has none. Safe to re-run; a second pass inserts nothing.
pub(crate) async fn run_progress() -> anyhow::Result<()> {
    let database_url = Config::database_url_from_env()?;
    let source = PgSource::connect(&database_url).await?;
    let inserted = source.backfill_lesson_progress().await?;
    println!("lesson_progress: {inserted} rows inserted");
    Ok(())
}

/// Attach lessons that still hang off a legacy gamified-map node to the
/// module that node maps to.
pub(crate) async fn run_map_modules() -> anyhow::Result<()> {
    let database_url = Config::database_url_from_env()?;
    let source = PgSource::connect(&database_url).await?;
    let updated = source.backfill_map_modules().await?;
    println!("module_lessons: {updated} lessons attached to modules");
    Ok(())
}
