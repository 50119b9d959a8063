//! Index build binary entry point.
//!
//! Optionally ingests scraped articles from a JSON file into the database, then
//! rebuilds the vector index and metadata files from every stored article.
//!
//! # Examples
//!
//! Rebuild from the existing database:
//! ```bash
//! build_index
//! ```
//!
//! Ingest new articles, then rebuild:
//! ```bash
//! build_index --input articles.json --db-path oncology_articles.db
//! ```

use anyhow::{Context, Result};
use article_search::{
    config::Settings,
    embedding::TfidfVectorizer,
    ingestion::{ArticleIngestion, IndexBuilder},
    provider::{json::JsonFileProvider, ArticleProvider},
    storage::{sqlite::SqliteStorage, ArticleStorage},
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Number of dated articles shown in the coverage report
const COVERAGE_SAMPLES: usize = 5;

/// Index build CLI
#[derive(Parser, Debug)]
#[command(
    name = "build_index",
    version,
    about = "Build the article search index from the article database",
    long_about = "Reads every article from the database, fits the TF-IDF vectorizer on titles \
                  and abstracts, and writes the vector index and its metadata file.

EXAMPLES:
  Rebuild from the existing database:
    build_index

  Ingest new articles first:
    build_index --input articles.json

  Custom output locations:
    build_index --index-path data/articles.index --metadata-path data/articles.json"
)]
struct BuildArgs {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON file of scraped articles to ingest before building
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Database file path
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Index file path
    #[arg(long, value_name = "PATH")]
    index_path: Option<PathBuf>,

    /// Metadata file path
    #[arg(long, value_name = "PATH")]
    metadata_path: Option<PathBuf>,

    /// Vocabulary cap for the vectorizer
    #[arg(long, value_name = "N")]
    max_features: Option<usize>,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Create storage, making the database directory if needed
fn create_storage(db_path: &Path) -> Result<SqliteStorage> {
    debug!("Creating SQLite storage at: {}", db_path.display());

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            info!("Created database directory: {:?}", parent);
        }
    }

    SqliteStorage::open(db_path).context("Failed to open database")
}

fn create_spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("[{elapsed_precise}] {spinner} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = BuildArgs::parse();

    init_logging(&args.log_level);
    debug!("CLI arguments: {:?}", args);

    let mut settings =
        Settings::load(args.config.as_deref()).with_context(|| "Failed to load settings")?;
    if let Some(db_path) = args.db_path {
        settings.db_path = db_path;
    }
    if let Some(index_path) = args.index_path {
        settings.index_path = index_path;
    }
    if let Some(metadata_path) = args.metadata_path {
        settings.metadata_path = metadata_path;
    }
    if let Some(max_features) = args.max_features {
        settings.max_features = max_features;
    }

    let start_time = Instant::now();

    let storage = create_storage(&settings.db_path)?;
    let mut ingestion = ArticleIngestion::initialize(storage)
        .await
        .context("Failed to initialize database")?;

    if let Some(input) = &args.input {
        if !input.exists() {
            anyhow::bail!("Input file not found: {:?}", input);
        }
        let provider = JsonFileProvider::new(input);
        info!("Ingesting articles from {}", provider.name());
        let stats = ingestion
            .ingest_from_provider(&provider)
            .await
            .with_context(|| format!("Failed to ingest articles from {:?}", input))?;

        println!("\n╔════════════════════════════════════════╗");
        println!("║      Ingestion Completed               ║");
        println!("╠════════════════════════════════════════╣");
        println!("║ Total processed:      {:>16} ║", stats.total_processed);
        println!("║ Inserted:             {:>16} ║", stats.inserted);
        println!("║ Duplicates skipped:   {:>16} ║", stats.duplicates_skipped);
        println!("║ Failed:               {:>16} ║", stats.failed);
        println!("╚════════════════════════════════════════╝");

        if stats.failed > 0 {
            warn!("{} articles failed to ingest - check logs for details", stats.failed);
        }
    }

    let paths = settings.index_paths();
    let builder = IndexBuilder::new(TfidfVectorizer::new(settings.max_features));
    let spinner = create_spinner("Building index...")?;
    let built = builder.build_and_save(ingestion.storage(), &paths).await;
    spinner.finish_and_clear();
    let (_, report) = built.context(
        "Failed to build the index. Ingest articles with --input if the database is empty.",
    )?;

    let coverage = ingestion
        .storage()
        .date_coverage(COVERAGE_SAMPLES)
        .await
        .context("Failed to read date coverage")?;

    let elapsed = start_time.elapsed();
    println!("\n╔════════════════════════════════════════╗");
    println!("║      Index Built                       ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Articles indexed:     {:>16} ║", report.rows);
    println!("║ Dimension:            {:>16} ║", report.dimension);
    println!("║ Articles with dates:  {:>16} ║", format!("{}/{}", coverage.with_dates, coverage.total));
    println!("║ Elapsed time:         {:>13.2?} ║", elapsed);
    println!("╚════════════════════════════════════════╝");
    println!("Index saved to {}", paths.index.display());
    println!("Metadata saved to {}", paths.metadata.display());

    if !coverage.samples.is_empty() {
        println!("\nSample publication dates:");
        for (title, pub_date) in &coverage.samples {
            println!("  {}  {}", pub_date, title);
        }
    }

    info!("Index build completed successfully");

    Ok(())
}
