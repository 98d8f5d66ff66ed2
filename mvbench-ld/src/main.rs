//! Loader (mvbench-ld) - Main entry point
//!
//! Loads a movie dataset file into the V1 or V2 collection of the
//! benchmark database, then prints a load summary and verification report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mvbench_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use mvbench_common::db::{init_database, SqliteDocumentStore};
use mvbench_common::SchemaVersion;
use mvbench_ld::{read_records, run_load, verify_collection, LoaderOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODULE_NAME: &str = "mvbench-ld";

/// Command-line arguments for mvbench-ld
#[derive(Parser, Debug)]
#[command(name = "mvbench-ld")]
#[command(about = "Load a movie dataset into the V1 or V2 benchmark collection")]
#[command(version)]
struct Args {
    /// Dataset file (.csv, .jsonl or .ndjson)
    #[arg(short, long)]
    input: PathBuf,

    /// Document layout to produce (v1 or v2)
    #[arg(short, long, default_value = "v1")]
    schema: SchemaVersion,

    /// Target collection (defaults to the schema's collection)
    #[arg(short, long)]
    collection: Option<String>,

    /// Documents per insert batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent insert batches
    #[arg(long)]
    workers: Option<usize>,

    /// Root folder holding the benchmark database
    #[arg(short, long, env = "MVBENCH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(MODULE_NAME);

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        "Starting mvbench-ld"
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_override(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!(database = %db_path.display(), "Opening database");
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let store = SqliteDocumentStore::new(pool);

    let mut options = LoaderOptions::new(
        args.schema,
        args.batch_size.unwrap_or(config.loader.batch_size),
        args.workers.unwrap_or(config.loader.workers),
    );
    if let Some(collection) = args.collection {
        options.collection = collection;
    }

    let records = read_records(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let summary = run_load(&store, records, &options)
        .await
        .context("Load failed")?;

    let report = verify_collection(&store, &options.collection, options.schema)
        .await
        .context("Verification failed")?;
    report.log();

    println!("Loaded {} ({})", options.collection, options.schema);
    println!("  rows read           {}", summary.rows_read);
    println!("  duplicates removed  {}", summary.duplicates_removed);
    println!("  transform errors    {}", summary.transform_errors);
    println!("  inserted            {}", summary.inserted);
    println!("  duplicate keys      {}", summary.duplicate_keys);
    println!("  other insert errors {}", summary.other_errors);
    println!("  documents in store  {}", report.total);
    println!("  with IMDB id        {}", report.with_imdb);
    match (report.min_year, report.max_year) {
        (Some(min), Some(max)) => println!("  release years       {}-{}", min, max),
        _ => println!("  release years       n/a"),
    }

    store.pool().close().await;
    Ok(())
}
