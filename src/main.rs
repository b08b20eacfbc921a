//! Cyber-news scraper main entry point
//!
//! This is the command-line interface for the cybersecurity news and advisory
//! scraper.

use anyhow::Context;
use clap::Parser;
use cyber_news_scraper::config::{load_config_with_hash, Config, FetchMode, SiteConfig};
use cyber_news_scraper::output::{load_statistics, print_run_summary, print_statistics};
use cyber_news_scraper::pipeline::{fetcher_for, find_chrome, RunController};
use cyber_news_scraper::storage::{SqliteStore, StorageError, StoreLocation};
use cyber_news_scraper::{ConfigError, ScraperError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Cyber-news scraper: cybersecurity news and advisory collector
///
/// Fetches a configured listing page (plain HTTP or headless browser),
/// extracts one record per entry, writes a JSON export and stores new
/// records in a document store keyed on the article link.
#[derive(Parser, Debug)]
#[command(name = "cyber-news-scraper")]
#[command(version)]
#[command(
    about = "Scrape cybersecurity news and advisories into a document store",
    long_about = None
)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Site to scrape (a `name` from the [[site]] tables)
    #[arg(short, long, value_name = "NAME")]
    site: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without fetching
    #[arg(long, conflicts_with_all = ["stats", "list_sites"])]
    dry_run: bool,

    /// Show per-collection document counts and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list_sites"])]
    stats: bool,

    /// List configured sites and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    list_sites: bool,

    /// Skip the document store; only write the export
    #[arg(long)]
    no_store: bool,

    /// Override the site's export path
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            let code = e
                .downcast_ref::<ScraperError>()
                .map(ScraperError::exit_code)
                .unwrap_or(4);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .map_err(ScraperError::from)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.list_sites {
        handle_list_sites(&config);
        return Ok(());
    }

    if cli.stats {
        return handle_stats(&config);
    }

    if cli.dry_run {
        return handle_dry_run(&config, cli.site.as_deref());
    }

    let site = select_site(&config, cli.site.as_deref()).map_err(ScraperError::from)?;
    handle_scrape(&config, site, cli.no_store, cli.export).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cyber_news_scraper=info,warn"),
            1 => EnvFilter::new("cyber_news_scraper=debug,info"),
            2 => EnvFilter::new("cyber_news_scraper=trace,debug"),
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

fn select_site<'a>(config: &'a Config, name: Option<&str>) -> Result<&'a SiteConfig, ConfigError> {
    let available = || {
        config
            .sites
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match name {
        Some(name) => config.site(name).ok_or_else(|| {
            ConfigError::UnknownSite(format!("'{}' (available: {})", name, available()))
        }),
        None if config.sites.len() == 1 => Ok(&config.sites[0]),
        None => Err(ConfigError::UnknownSite(format!(
            "--site is required (available: {})",
            available()
        ))),
    }
}

/// Handles --list-sites: prints every configured site
fn handle_list_sites(config: &Config) {
    println!("Configured sites ({}):", config.sites.len());
    for site in &config.sites {
        println!(
            "  {:<10} {:<9} {} -> {}",
            site.name,
            site.fetch.label(),
            site.source,
            site.collection
        );
    }
}

/// Handles --stats: shows per-collection document counts
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Store: {}\n", config.storage.uri);

    let location = StoreLocation::parse(&config.storage.uri).map_err(ScraperError::from)?;
    let store = match SqliteStore::open_read_only(&location) {
        Ok(store) => store,
        Err(StorageError::NotFound(_)) => {
            println!("No documents stored yet");
            return Ok(());
        }
        Err(e) => return Err(ScraperError::from(e).into()),
    };
    let stats = load_statistics(&store).map_err(ScraperError::from)?;

    print_statistics(&stats);

    Ok(())
}

/// Handles --dry-run: validates config and shows what would be scraped
fn handle_dry_run(config: &Config, site: Option<&str>) -> anyhow::Result<()> {
    println!("=== Cyber-News Scraper Dry Run ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!(
        "  Timeouts: {}s total, {}s connect",
        config.http.timeout_secs, config.http.connect_timeout_secs
    );

    println!("\nStorage:");
    println!("  URI: {}", config.storage.uri);
    println!(
        "  Connection attempts: {} ({:?} backoff, {}ms)",
        config.storage.retries, config.storage.backoff, config.storage.retry_delay_ms
    );

    let sites: Vec<&SiteConfig> = match site {
        Some(name) => vec![select_site(config, Some(name)).map_err(ScraperError::from)?],
        None => config.sites.iter().collect(),
    };

    println!("\nSites ({}):", sites.len());
    for site in sites {
        println!("  - {} ({})", site.name, site.source);
        println!("    URL: {}", site.url);
        println!("    Mode: {}", site.fetch.label());
        println!("    Collection: {}", site.collection);
        if let Some(path) = &site.export_path {
            println!("    Export: {}", path);
        }
        println!("    Container: {}", site.selectors.container);
        if let FetchMode::Rendered(options) = &site.fetch {
            println!("    Wait selector: {}", options.wait_selector);
            match find_chrome(options.chrome_executable.as_deref()) {
                Ok(path) => println!("    Chrome: {}", path.display()),
                Err(e) => println!("    Chrome: MISSING ({})", e),
            }
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main scrape operation for one site
async fn handle_scrape(
    config: &Config,
    site: &SiteConfig,
    no_store: bool,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Fail fast when the browser a rendered site needs is missing
    if let FetchMode::Rendered(options) = &site.fetch {
        find_chrome(options.chrome_executable.as_deref()).map_err(ScraperError::from)?;
    }

    let fetcher = fetcher_for(site, &config.http).map_err(ScraperError::from)?;

    let mut controller =
        RunController::new(site.clone(), config.storage.clone()).map_err(ScraperError::from)?;
    if let Some(path) = export {
        controller = controller.with_export_path(path);
    }
    if no_store {
        controller = controller.without_store();
    }

    let result = controller
        .run(fetcher.as_ref())
        .await
        .with_context(|| format!("scraping {}", site.name))?;

    print_run_summary(&result);

    Ok(())
}
