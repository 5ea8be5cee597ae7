//! Crawl Explorer main entry point
//!
//! This is the command-line interface for talking to a Firecrawl-compatible
//! crawling service and managing saved exports.

use clap::{Args, Parser, Subcommand};
use crawl_explorer::api::{CrawlOptions, MapOptions, PageOptions, ScrapeFormat, ScrapeOptions};
use crawl_explorer::config::{load_config, Settings, SettingsUpdate};
use crawl_explorer::explorer::ExportOptions;
use crawl_explorer::export::{ExportCategory, ExportFormat, ExportPayload};
use crawl_explorer::model::ApiResult;
use crawl_explorer::{Explorer, ExplorerError};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Crawl Explorer: scrape, crawl and map websites through a crawling service
///
/// Results can be printed or saved as categorized exports with metadata,
/// then listed, searched, shown and deleted later.
#[derive(Parser, Debug)]
#[command(name = "crawl-explorer")]
#[command(version)]
#[command(about = "Explore websites through a Firecrawl-compatible API", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single page
    Scrape {
        url: String,

        /// Formats to request (markdown, html, rawHtml, text, json, links, screenshot)
        #[arg(short, long = "format", value_parser = parse_scrape_format)]
        formats: Vec<ScrapeFormat>,

        /// Only return the main content of the page
        #[arg(long)]
        main_only: bool,

        /// Milliseconds to wait for JavaScript before capturing
        #[arg(long)]
        wait_for: Option<u64>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Crawl a site and wait for the job to finish
    Crawl {
        url: String,

        /// Maximum pages to crawl
        #[arg(long)]
        limit: Option<u32>,

        /// Maximum link depth
        #[arg(long)]
        max_depth: Option<u32>,

        /// Path regex to include (repeatable)
        #[arg(long = "include")]
        include_paths: Vec<String>,

        /// Path regex to exclude (repeatable)
        #[arg(long = "exclude")]
        exclude_paths: Vec<String>,

        /// Ignore the site's sitemap
        #[arg(long)]
        ignore_sitemap: bool,

        /// Sent as x-idempotency-key so a retried submission is not duplicated
        #[arg(long)]
        idempotency_key: Option<String>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Keep waiting on a crawl job submitted earlier
    Resume {
        job_id: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// List the links of a site
    Map {
        url: String,

        /// Only return links matching this term
        #[arg(long)]
        search: Option<String>,

        /// Maximum links to return
        #[arg(long)]
        limit: Option<u32>,

        /// Only use the sitemap
        #[arg(long)]
        sitemap_only: bool,

        /// Include subdomains
        #[arg(long)]
        include_subdomains: bool,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Manage saved exports
    #[command(subcommand)]
    Exports(ExportsCommand),

    /// Show the effective settings
    Settings,
}

#[derive(Subcommand, Debug)]
enum ExportsCommand {
    /// List exports in a category
    List {
        #[arg(value_parser = parse_category)]
        category: ExportCategory,

        /// Case-insensitive filter on file name and metadata
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print an export and its metadata
    Show { path: PathBuf },

    /// Delete an export and its metadata sidecar
    Delete { path: PathBuf },
}

#[derive(Args, Debug)]
struct SaveArgs {
    /// Save the result in this format (markdown, html, text, json)
    #[arg(long, value_parser = parse_export_format)]
    save: Option<ExportFormat>,

    /// File name for the saved export
    #[arg(long, requires = "save")]
    filename: Option<String>,

    /// Description stored in the export metadata
    #[arg(long, requires = "save")]
    description: Option<String>,

    /// Tag stored in the export metadata (repeatable)
    #[arg(long = "tag", requires = "save")]
    tags: Vec<String>,
}

impl SaveArgs {
    fn options(&self) -> Option<ExportOptions> {
        self.save.map(|format| ExportOptions {
            format,
            category: None,
            filename: self.filename.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        })
    }
}

fn parse_scrape_format(s: &str) -> Result<ScrapeFormat, String> {
    ScrapeFormat::from_name(s).ok_or_else(|| format!("unknown scrape format '{}'", s))
}

fn parse_export_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_name(s).ok_or_else(|| format!("unknown export format '{}'", s))
}

fn parse_category(s: &str) -> Result<ExportCategory, String> {
    ExportCategory::from_name(s).ok_or_else(|| format!("unknown export category '{}'", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config(path) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Settings::default(),
    };

    let mut explorer = Explorer::new(settings)?;
    if cli.api_url.is_some() || cli.api_key.is_some() {
        explorer.update_settings(SettingsUpdate {
            base_url: cli.api_url.clone(),
            api_key: cli.api_key.clone().map(Some),
            ..Default::default()
        })?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Scrape {
            url,
            formats,
            main_only,
            wait_for,
            save,
        } => {
            let options = ScrapeOptions {
                url,
                formats,
                only_main_content: main_only.then_some(true),
                wait_for_ms: wait_for,
                ..Default::default()
            };
            handle_scrape(&explorer, options, &save).await?;
        }
        Command::Crawl {
            url,
            limit,
            max_depth,
            include_paths,
            exclude_paths,
            ignore_sitemap,
            idempotency_key,
            save,
        } => {
            let options = CrawlOptions {
                url,
                include_paths,
                exclude_paths,
                max_depth,
                limit,
                ignore_sitemap: ignore_sitemap.then_some(true),
                scrape_options: Some(PageOptions::default()),
                ..Default::default()
            };
            handle_crawl(&explorer, options, idempotency_key.as_deref(), cancel, &save).await?;
        }
        Command::Resume { job_id, save } => {
            handle_resume(&explorer, &job_id, cancel, &save).await?;
        }
        Command::Map {
            url,
            search,
            limit,
            sitemap_only,
            include_subdomains,
            save,
        } => {
            let options = MapOptions {
                url,
                search,
                limit,
                sitemap_only: sitemap_only.then_some(true),
                include_subdomains: include_subdomains.then_some(true),
                ..Default::default()
            };
            handle_map(&explorer, options, &save).await?;
        }
        Command::Exports(command) => handle_exports(&explorer, command)?,
        Command::Settings => handle_settings(explorer.settings()),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_explorer=info,warn"),
            1 => EnvFilter::new("crawl_explorer=debug,info"),
            2 => EnvFilter::new("crawl_explorer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Saves a result when `--save` was given
fn save_if_requested(
    explorer: &Explorer,
    result: &ApiResult,
    save: &SaveArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let Some(options) = save.options() else {
        return Ok(false);
    };

    let path = explorer.save_export(result, &options)?;
    println!("✓ Saved to: {}", path.display());
    Ok(true)
}

async fn handle_scrape(
    explorer: &Explorer,
    options: ScrapeOptions,
    save: &SaveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let result: ApiResult = explorer.scrape(&options).await?.into();

    if !save_if_requested(explorer, &result, save)? {
        print_payload(&result, ExportFormat::Markdown)?;
    }
    Ok(())
}

async fn handle_crawl(
    explorer: &Explorer,
    options: CrawlOptions,
    idempotency_key: Option<&str>,
    cancel: CancellationToken,
    save: &SaveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = explorer
        .crawl_with(&options, idempotency_key, cancel, |progress| {
            tracing::info!(
                "Crawl {}: {}/{} pages ({}, check {}/{})",
                progress.job_id,
                progress.completed,
                progress.total,
                progress.status,
                progress.attempt,
                progress.max_attempts
            );
        })
        .await;

    finish_crawl(explorer, outcome, save)
}

async fn handle_resume(
    explorer: &Explorer,
    job_id: &str,
    cancel: CancellationToken,
    save: &SaveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = explorer
        .resume_crawl_with(job_id, cancel, |progress| {
            tracing::info!(
                "Crawl {}: {}/{} pages ({})",
                progress.job_id,
                progress.completed,
                progress.total,
                progress.status
            );
        })
        .await;

    finish_crawl(explorer, outcome, save)
}

fn finish_crawl(
    explorer: &Explorer,
    outcome: crawl_explorer::Result<crawl_explorer::model::CrawlResult>,
    save: &SaveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        Ok(result) => {
            println!(
                "✓ Crawl {} finished: {} pages{}",
                result.job_id,
                result.page_count(),
                if result.truncated { " (truncated)" } else { "" }
            );
            let result = ApiResult::from(result);
            if !save_if_requested(explorer, &result, save)? {
                print_payload(&result, ExportFormat::Json)?;
            }
            Ok(())
        }
        Err(ExplorerError::TimedOut { job_id, attempts }) => {
            tracing::error!(
                "Crawl {} still running after {} checks; resume with `crawl-explorer resume {}`",
                job_id,
                attempts,
                job_id
            );
            Err(ExplorerError::TimedOut { job_id, attempts }.into())
        }
        Err(ExplorerError::JobFailed {
            job_id,
            status,
            partial,
        }) => {
            tracing::error!(
                "Crawl {} ended with status {} after {} pages",
                job_id,
                status,
                partial.page_count()
            );
            if partial.page_count() > 0 {
                save_if_requested(explorer, &ApiResult::from(*partial.clone()), save)?;
            }
            Err(ExplorerError::JobFailed {
                job_id,
                status,
                partial,
            }
            .into())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

async fn handle_map(
    explorer: &Explorer,
    options: MapOptions,
    save: &SaveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let result: ApiResult = explorer.map(&options).await?.into();

    if !save_if_requested(explorer, &result, save)? {
        print_payload(&result, ExportFormat::Text)?;
    }
    Ok(())
}

fn print_payload(result: &ApiResult, format: ExportFormat) -> Result<(), Box<dyn std::error::Error>> {
    match result.render(format)? {
        ExportPayload::Text(text) => print!("{}", text),
        ExportPayload::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}

fn handle_exports(
    explorer: &Explorer,
    command: ExportsCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ExportsCommand::List { category, search } => {
            let exports = explorer.list_exports(category, search.as_deref())?;
            println!(
                "=== {} exports ({}) ===\n",
                category,
                explorer.store().category_dir(category).display()
            );

            if exports.is_empty() {
                println!("  (none)");
            }
            for export in &exports {
                println!("  {} ({} bytes)", export.filename, export.size_bytes);
                if let Some(metadata) = &export.metadata {
                    println!("    Source: {}", metadata.source_url);
                    println!("    Created: {}", metadata.created_at.format("%Y-%m-%d %H:%M:%S"));
                    if let Some(description) = &metadata.description {
                        println!("    Description: {}", description);
                    }
                    if !metadata.tags.is_empty() {
                        println!("    Tags: {}", metadata.tags.join(", "));
                    }
                }
            }
        }
        ExportsCommand::Show { path } => {
            let content = explorer.read_export(&path)?;
            if let Some(metadata) = &content.metadata {
                eprintln!("Source: {}", metadata.source_url);
                eprintln!("Created: {}", metadata.created_at.format("%Y-%m-%d %H:%M:%S"));
                if let Some(description) = &metadata.description {
                    eprintln!("Description: {}", description);
                }
                if !metadata.tags.is_empty() {
                    eprintln!("Tags: {}", metadata.tags.join(", "));
                }
                eprintln!();
            }
            match content.payload {
                ExportPayload::Text(text) => print!("{}", text),
                ExportPayload::Json(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?)
                }
            }
        }
        ExportsCommand::Delete { path } => {
            explorer.delete_export(&path)?;
            println!("✓ Deleted: {}", path.display());
        }
    }
    Ok(())
}

fn handle_settings(settings: &Settings) {
    println!("=== Crawl Explorer Settings ===\n");

    println!("API:");
    println!("  Base URL: {}", settings.api.base_url);
    println!("  API key: {}", settings.api.masked_api_key());
    println!("  Timeout: {}s", settings.api.timeout_secs);

    println!("\nPoller:");
    println!("  Interval: {}ms", settings.poller.poll_interval_ms);
    println!("  Max attempts: {}", settings.poller.max_attempts);
    println!("  Max page follows: {}", settings.poller.max_page_follows);

    println!("\nExports:");
    println!("  Root: {}", settings.exports.root_dir.display());
    for category in ExportCategory::all() {
        let dir = settings
            .exports
            .directories
            .get(category.as_str())
            .cloned()
            .unwrap_or_else(|| settings.exports.root_dir.join(category.as_str()));
        println!("  {}: {}", category, dir.display());
    }
}
