use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mirai-sync")]
#[command(about = "Postgres to MongoDB migration pipeline for Miraimusic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot full migration seeding the document store
    Migrate {
        /// Report counts and sample documents without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Propagate rows changed since the last sync watermark
    Sync,
    /// Seed missing lesson_progress rows for enrolled students
    BackfillProgress,
    /// Attach legacy gamified-map lessons to their modules
    BackfillModules,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate { dry_run } => commands::migrate::run(dry_run).await,
        Commands::Sync => commands::sync::run().await,
        Commands::BackfillProgress => commands::backfill::run_progress().await,
        Commands::BackfillModules => commands::backfill::run_map_modules().await,
    }
}
