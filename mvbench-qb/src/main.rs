//! Query Benchmark (mvbench-qb) - Main entry point
//!
//! Subcommands:
//! - `run`: measure every catalog query on V1 and V2, write the JSON report
//! - `validate`: check the V2 collection for the precomputed fields
//! - `queries`: print the catalog pipelines

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mvbench_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use mvbench_common::db::{init_database, SqliteDocumentStore};
use mvbench_qb::{
    catalog, preflight, run_benchmark, validate_v2, CliFormatter, ComparisonReport, RunOptions,
    REPORT_FILE_NAME,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODULE_NAME: &str = "mvbench-qb";

/// Command-line arguments for mvbench-qb
#[derive(Parser, Debug)]
#[command(name = "mvbench-qb")]
#[command(about = "Compare query performance of the V1 and V2 movie layouts")]
#[command(version)]
struct Cli {
    /// Root folder holding the benchmark database
    #[arg(short, long, global = true, env = "MVBENCH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure every query pair and write the comparison report
    Run {
        /// Executions per query and layout
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Per-execution timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Folder for performance_comparison.json
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        v1_collection: Option<String>,

        #[arg(long)]
        v2_collection: Option<String>,
    },

    /// Validate the precomputed fields of the V2 collection
    Validate {
        #[arg(long)]
        collection: Option<String>,
    },

    /// Print the query catalog
    Queries,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TomlConfig::load_or_default(MODULE_NAME);

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
        profile = env!("BUILD_PROFILE"),
        "Starting mvbench-qb"
    );

    if let Command::Queries = cli.command {
        for query in catalog() {
            println!("{}: {}", query.key, query.name);
            println!("  {}", query.description);
            println!("  V1: {}", serde_json::to_string(&query.v1)?);
            println!("  V2: {}", serde_json::to_string(&query.v2)?);
        }
        return Ok(());
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_override(cli.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    if !initializer.database_exists() {
        bail!(
            "No benchmark database at {}; load the collections with mvbench-ld first",
            initializer.database_path().display()
        );
    }
    let pool = init_database(&initializer.database_path())
        .await
        .context("Failed to open database")?;
    let store = SqliteDocumentStore::new(pool);

    let benchmark = &config.benchmark;
    match cli.command {
        Command::Run {
            iterations,
            timeout_ms,
            output,
            v1_collection,
            v2_collection,
        } => {
            let options = RunOptions {
                iterations: iterations.unwrap_or(benchmark.iterations).max(1),
                sample_timeout: Duration::from_millis(timeout_ms.unwrap_or(benchmark.sample_timeout_ms)),
                v1_collection: v1_collection.unwrap_or_else(|| benchmark.v1_collection.clone()),
                v2_collection: v2_collection.unwrap_or_else(|| benchmark.v2_collection.clone()),
            };

            preflight(&store, &options).await.context("Preflight failed")?;
            let outcomes = run_benchmark(&store, &catalog(), &options)
                .await
                .context("Benchmark failed")?;
            let report = ComparisonReport::new(options.iterations, &outcomes);

            let output = output.unwrap_or_else(|| benchmark.output_folder.clone());
            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let report_path = output.join(REPORT_FILE_NAME);
            report
                .export_json(&report_path)
                .with_context(|| format!("Failed to write {}", report_path.display()))?;
            info!(path = %report_path.display(), run_id = %report.run_id, "Report written");

            print!("{}", CliFormatter::format_results_table(&report));
            print!("{}", CliFormatter::format_summary(&report));
        }
        Command::Validate { collection } => {
            let collection = collection.unwrap_or_else(|| benchmark.v2_collection.clone());
            let report = validate_v2(&store, &collection)
                .await
                .context("Validation failed")?;
            print!("{}", report.format());
            if !report.is_valid() {
                bail!("V2 validation failed: missing {:?}", report.missing_fields());
            }
        }
        Command::Queries => {}
    }

    store.pool().close().await;
    Ok(())
}
