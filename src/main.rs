//! Book-Harvest main entry point
//!
//! This is the command-line interface for crawling a book catalog and
//! querying the dataset it produces.

use book_harvest::catalog::{check_health, Catalog};
use book_harvest::config::{load_config_with_hash, Config};
use book_harvest::crawler::Coordinator;
use book_harvest::output::{print_summary, Dataset, RunSummary};
use book_harvest::url::{listing_page_url, normalize_base_url};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Book-Harvest: a catalog crawler for paginated book listings
///
/// Crawls every listing page and book detail page of the catalog, then
/// writes a deduplicated CSV dataset. The query modes read an existing
/// dataset without crawling.
#[derive(Parser, Debug)]
#[command(name = "book-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A catalog crawler for paginated book listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "search", "category", "lookup"])]
    dry_run: bool,

    /// Show health and categories of the existing dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "search", "category", "lookup"])]
    stats: bool,

    /// Search the existing dataset by title (case-insensitive substring)
    #[arg(long, value_name = "TEXT", conflicts_with = "lookup")]
    search: Option<String>,

    /// Search the existing dataset by category (case-insensitive substring)
    #[arg(long, value_name = "TEXT", conflicts_with = "lookup")]
    category: Option<String>,

    /// Show one book of the existing dataset by id
    #[arg(long, value_name = "ID")]
    lookup: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let dataset_path = PathBuf::from(&config.output.dataset_path);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&dataset_path);
    } else if let Some(id) = &cli.lookup {
        handle_lookup(&dataset_path, id)?;
    } else if cli.search.is_some() || cli.category.is_some() {
        handle_search(
            &dataset_path,
            cli.search.as_deref(),
            cli.category.as_deref(),
        )?;
    } else {
        handle_crawl(&config, &dataset_path).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("book_harvest=info,warn"),
            1 => EnvFilter::new("book_harvest=debug,info"),
            2 => EnvFilter::new("book_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Book-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Max listing pages: {}", config.crawler.max_pages);

    let base_url = normalize_base_url(&config.site.base_url)?;
    println!("\nSite:");
    println!("  Base URL: {}", base_url);
    println!("  First listing page: {}", listing_page_url(&base_url, 1)?);
    println!("  Page N pattern: {}", listing_page_url(&base_url, 2)?);
    println!("  User agent: {}", config.site.user_agent);

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows dataset health and categories
fn handle_stats(dataset_path: &Path) {
    let health = check_health(dataset_path);

    println!("=== Dataset Status ===\n");
    println!("  File: {}", health.path.display());
    println!("  Exists: {}", health.file_exists);
    println!("  Loaded: {}", health.loaded);
    println!("  Books: {}", health.rows);
    println!("  Columns: {}", health.columns.join(", "));
    if let Some(error) = &health.error {
        println!("  Error: {}", error);
    }
    println!(
        "  Status: {}",
        if health.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        }
    );

    if health.loaded {
        if let Ok(catalog) = Catalog::load(dataset_path) {
            let categories = catalog.categories();
            println!("\nCategories ({}):", categories.len());
            for category in categories {
                println!("  - {}", category);
            }
        }
    }
}

/// Handles --search/--category: lists matching books
fn handle_search(
    dataset_path: &Path,
    title: Option<&str>,
    category: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(dataset_path)?;
    let hits = catalog.search(title, category);

    println!("Found {} books", hits.len());
    for entry in hits {
        println!(
            "  {:>5}  {}  [{}]  £{:.2}  {}",
            entry.id, entry.title, entry.category, entry.price, entry.rating
        );
    }

    Ok(())
}

/// Handles --lookup: prints one full record
fn handle_lookup(dataset_path: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(dataset_path)?;
    let entry = catalog.get(id)?;

    println!("id:              {}", entry.id);
    println!("titulo:          {}", entry.title);
    println!("preco:           {:.2}", entry.price);
    println!("rating:          {}", entry.rating);
    println!("disponibilidade: {}", entry.availability);
    println!("categoria:       {}", entry.category);
    println!("imagem:          {}", entry.image);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    dataset_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} with {} concurrent fetches",
        config.site.base_url,
        config.crawler.max_concurrent_fetches
    );

    let coordinator = Coordinator::from_config(config)?;
    let result = match coordinator.run().await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let dataset = Dataset::assemble(&result);
    dataset.write_to(dataset_path)?;

    let summary = RunSummary::new(&result, &dataset);
    print_summary(&summary);
    println!("Dataset saved: {}", dataset_path.display());

    Ok(())
}
