//! Search binary entry point.
//!
//! This binary provides a command-line interface for searching articles with a
//! pre-built index. It supports single-query and interactive REPL modes, with
//! table or JSON output.
//!
//! # Examples
//!
//! Content search:
//! ```bash
//! search --query "breast cancer immunotherapy"
//! ```
//!
//! Combined search, JSON output:
//! ```bash
//! search --query "tumor" --start-date 2020-01-01 --end-date 2020-12-31 --format json
//! ```
//!
//! Date-range listing:
//! ```bash
//! search --start-date 2021-01-01 --end-date 2021-03-31
//! ```
//!
//! Interactive mode:
//! ```bash
//! search --interactive
//! ```

use anyhow::{Context, Result};
use article_search::{
    config::Settings,
    embedding::TfidfVectorizer,
    index::{IndexCache, IndexPaths},
    models::{RelevanceLevel, SearchResult},
    query::{parse_date_bounds, DateRange, RetrievalEngine, SearchEngine, SearchQuery},
    storage::{sqlite::SqliteStorage, ArticleStorage},
};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Engine = RetrievalEngine<SqliteStorage, TfidfVectorizer>;

/// Output format for search results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table with colored relevance levels
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Search binary CLI for querying the article index
#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search articles by content, publication date, or both",
    long_about = "Query the article index using lexical similarity, an exact publication \
                  date range, or both combined. Supports single-query and interactive modes.

EXAMPLES:
  Content search:
    search --query \"breast cancer immunotherapy\"

  Combined search with JSON output:
    search --query \"tumor\" --start-date 2020-01-01 --end-date 2020-12-31 --format json

  Articles published in a range:
    search --start-date 2021-01-01 --end-date 2021-03-31

  Interactive mode:
    search --interactive"
)]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file path
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Index file path
    #[arg(long, value_name = "PATH")]
    index_path: Option<PathBuf>,

    /// Metadata file path
    #[arg(long, value_name = "PATH")]
    metadata_path: Option<PathBuf>,

    /// Search text
    #[arg(long, value_name = "TEXT", conflicts_with = "interactive")]
    query: Option<String>,

    /// Keep articles published on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "end_date")]
    start_date: Option<String>,

    /// Keep articles published on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "start_date")]
    end_date: Option<String>,

    /// Number of results to return
    #[arg(long, value_name = "N")]
    top_k: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Execute a search query and return results
async fn execute_search(
    engine: &Engine,
    query_text: Option<&str>,
    top_k: usize,
    date_range: Option<DateRange>,
) -> Result<Vec<SearchResult>> {
    debug!("Executing search for query: {:?}", query_text);

    let query = SearchQuery::new(query_text.map(str::to_string), Some(top_k), date_range);

    engine
        .search(&query)
        .await
        .with_context(|| format!("Failed to execute search for query: {:?}", query_text))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// Format results as a pretty table
fn format_results_table(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Date").add_attribute(Attribute::Bold),
        Cell::new("Relevance").add_attribute(Attribute::Bold),
        Cell::new("Distance").add_attribute(Attribute::Bold),
    ]);

    for (idx, result) in results.iter().enumerate() {
        let (relevance_str, color) = match result.relevance() {
            RelevanceLevel::HighlyRelevant => ("HIGHLY_RELEVANT", Color::Green),
            RelevanceLevel::Relevant => ("RELEVANT", Color::Yellow),
            RelevanceLevel::SomewhatRelated => ("SOMEWHAT_RELATED", Color::White),
        };

        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(result.id),
            Cell::new(truncate(&result.title, 60)),
            Cell::new(result.date.as_deref().unwrap_or("-")),
            Cell::new(relevance_str).fg(color),
            Cell::new(format!("{:.4}", result.distance)),
        ]);
    }

    table.to_string()
}

/// Format results as JSON
fn format_results_json(results: &[SearchResult]) -> Result<String> {
    serde_json::to_string_pretty(results).with_context(|| "Failed to serialize results to JSON")
}

fn print_results(results: &[SearchResult], format: OutputFormat, elapsed_secs: f64) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", format_results_table(results));
            println!("\nFound {} results in {:.2}s", results.len(), elapsed_secs);
        }
        OutputFormat::Json => println!("{}", format_results_json(results)?),
    }
    Ok(())
}

/// Display detailed view of a single result
fn display_result_detail(result: &SearchResult, rank: usize) {
    println!("\n{}", "═".repeat(80));
    println!("Rank: {}", rank);
    println!("ID: {}", result.id);
    println!("Title: {}", result.title);
    if let Some(date) = &result.date {
        println!("Published: {}", date);
    }
    println!("Relevance: {:?}", result.relevance());
    println!("Distance: {:.4}", result.distance);
    println!("\nAbstract:\n{}", result.abstract_or_placeholder());
    println!("{}", "═".repeat(80));
}

fn print_help() {
    println!("Commands:");
    println!("  <query>          - Search article content");
    println!("  /top N           - Set number of results to N");
    println!("  /date START END  - Restrict searches to a date range (YYYY-MM-DD)");
    println!("  /date clear      - Clear date filter");
    println!("  /list            - List articles in the current date range");
    println!("  /format table    - Use table output format");
    println!("  /format json     - Use JSON output format");
    println!("  /detail N        - Show full details for result rank N");
    println!("  /help            - Show this help");
    println!("  Ctrl+D or Ctrl+C - Exit");
}

/// Run interactive REPL mode
async fn run_interactive(
    engine: Engine,
    mut top_k: usize,
    mut date_range: Option<DateRange>,
    mut format: OutputFormat,
) -> Result<()> {
    println!("Interactive Article Search");
    print_help();
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    let mut last_results: Vec<SearchResult> = Vec::new();

    loop {
        let readline = rl.readline("Search> ");
        match readline {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line).ok();

                let search_text = if line.starts_with('/') {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    match parts[0] {
                        "/help" => {
                            print_help();
                            continue;
                        }
                        "/top" => {
                            match parts.get(1).map(|n| n.parse::<usize>()) {
                                Some(Ok(n)) if n > 0 && parts.len() == 2 => {
                                    top_k = n;
                                    println!("Set top-k to {}", top_k);
                                }
                                _ => eprintln!("Usage: /top N (a positive integer)"),
                            }
                            continue;
                        }
                        "/date" => {
                            match parts.as_slice() {
                                [_, "clear"] => {
                                    date_range = None;
                                    println!("Cleared date filter");
                                }
                                [_, start, end] => match parse_date_bounds(Some(*start), Some(*end)) {
                                    Ok(Some(range)) => {
                                        date_range = Some(range);
                                        println!("Set date filter: {} - {}", range.start(), range.end());
                                    }
                                    Ok(None) => {}
                                    Err(e) => eprintln!("{}", e),
                                },
                                _ => eprintln!("Usage: /date START END  or  /date clear"),
                            }
                            continue;
                        }
                        "/list" => {
                            if date_range.is_none() {
                                eprintln!("No date filter set. Use /date START END first.");
                                continue;
                            }
                            None
                        }
                        "/format" => {
                            match parts.get(1).copied() {
                                Some("table") => {
                                    format = OutputFormat::Table;
                                    println!("Set output format to table");
                                }
                                Some("json") => {
                                    format = OutputFormat::Json;
                                    println!("Set output format to JSON");
                                }
                                _ => eprintln!("Usage: /format [table|json]"),
                            }
                            continue;
                        }
                        "/detail" => {
                            match parts.get(1).map(|n| n.parse::<usize>()) {
                                Some(Ok(rank)) if rank > 0 && rank <= last_results.len() => {
                                    display_result_detail(&last_results[rank - 1], rank);
                                }
                                Some(Ok(rank)) if rank > last_results.len() => {
                                    eprintln!(
                                        "Rank {} out of range (last search had {} results)",
                                        rank,
                                        last_results.len()
                                    );
                                }
                                _ => eprintln!("Usage: /detail N (a positive integer)"),
                            }
                            continue;
                        }
                        other => {
                            eprintln!("Unknown command: {}. Type /help for available commands.", other);
                            continue;
                        }
                    }
                } else {
                    Some(line)
                };

                let start = Instant::now();
                match execute_search(&engine, search_text, top_k, date_range).await {
                    Ok(results) => {
                        if let Err(e) = print_results(&results, format, start.elapsed().as_secs_f64()) {
                            eprintln!("Error formatting results: {}", e);
                        }
                        last_results = results;
                    }
                    Err(e) => eprintln!("Search failed: {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    setup_logging(&args.log_level);

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
    let top_k = args.top_k.unwrap_or(settings.top_k);

    let date_range = parse_date_bounds(args.start_date.as_deref(), args.end_date.as_deref())?;

    if !args.interactive && args.query.is_none() && date_range.is_none() {
        anyhow::bail!(
            "Either --query, a date range (--start-date/--end-date) or --interactive must be specified.\n\
             Use --help for usage information."
        );
    }

    if !settings.db_path.exists() {
        anyhow::bail!(
            "Database file not found: {}\n\
             Please run the build_index binary first to create the database.",
            settings.db_path.display()
        );
    }

    let paths: IndexPaths = settings.index_paths();
    info!(
        "Loading index from {} and {}",
        paths.index.display(),
        paths.metadata.display()
    );
    let mut storage = SqliteStorage::open(&settings.db_path)
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))?;
    storage
        .initialize()
        .await
        .with_context(|| "Failed to initialize storage")?;
    let stored = storage
        .count_articles()
        .await
        .with_context(|| "Failed to count stored articles")?;

    let cache = IndexCache::default();
    let engine = RetrievalEngine::from_cache(
        &cache,
        &paths,
        storage,
        TfidfVectorizer::new(settings.max_features),
    )
    .with_context(|| {
        "Failed to load the search index.\n\
         Please run the build_index binary to build it first."
    })?
    .with_oversample(settings.oversample);

    let indexed = engine.index().index().len();
    info!("Index holds {} articles", indexed);
    if stored != indexed {
        warn!(
            "Database holds {} articles but the index was built from {}; \
             run build_index to search the current corpus",
            stored, indexed
        );
    }

    if args.interactive {
        run_interactive(engine, top_k, date_range, args.format).await?;
    } else {
        let start = Instant::now();
        let results = execute_search(&engine, args.query.as_deref(), top_k, date_range).await?;
        print_results(&results, args.format, start.elapsed().as_secs_f64())?;
    }

    Ok(())
}
