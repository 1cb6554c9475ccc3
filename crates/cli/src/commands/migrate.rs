//! Full Postgres → MongoDB migration command.
//!
//! Seeds the document store from the relational source, parents before
//! children. Upserts are keyed by `old_id`, so re-running is safe.

use mirai_sync_core::Config;
use mirai_sync_pipeline::FullMigrator;
use mirai_sync_storage::{DocSink, PgSource};

pub(crate) async fn run(dry_run: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let source = PgSource::connect(&config.database_url).await?;
    let sink = DocSink::connect(&config.mongodb_uri, &config.mongodb_db).await?;

    if dry_run {
        println!("Dry run: nothing will be written.");
    }
    println!("Migrating tables...");
    let report =
        FullMigrator::new(source, sink, config.batch_size, dry_run).run().await?;

    for table in &report.tables {
        if table.failed && table.read == 0 {
            println!("  {} -> {}: FAILED, table skipped", table.table, table.collection);
            continue;
        }
        if report.dry_run {
            println!(
                "  {} -> {}: would migrate {} rows",
                table.table, table.collection, table.read
            );
            for sample in &table.sample {
                println!("{}", serde_json::to_string_pretty(sample)?);
            }
        } else {
            println!(
                "  {} -> {}: {} inserted, {} updated, {} skipped, {} null parent refs",
                table.table,
                table.collection,
                table.inserted,
                table.updated,
                table.skipped,
                table.null_refs
            );
        }
    }

    println!("\nMigration complete!");
    Ok(())
}
