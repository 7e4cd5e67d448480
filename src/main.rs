//! # sift CLI
//!
//! Command-line front end for the search result extractor.
//!
//! - `extract`: pull records out of a saved result page
//! - `fetch`: request a page from the search server, optionally storing it
//! - `run`: run the ETL pipeline over every stored search
//! - `users`: manage the users searches belong to
//! - `records`: list extracted records
//!
//! Settings come from `sift.toml` (see `--config`) with `SIFT_*` environment
//! overrides.

mod telemetry;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sift::config::{Config, DEFAULT_CONFIG_PATH};
use sift::extractor::{ExtractedRecord, SearchResultExtractor, TreeExtractor};
use sift::pipeline::{EtlPipeline, PipelineProgress};
use sift::search::{SearchClient, result_html};
use sift::store::{Database, SearchResult, User};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Heuristic extraction of search results from result pages", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract search results from a saved HTML page
    Extract(ExtractArgs),

    /// Fetch a result page from the search server
    Fetch(FetchArgs),

    /// Run the extraction pipeline over stored searches
    Run,

    /// Manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// List extracted records
    Records(RecordsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// HTML file to extract from
    #[arg(required = true)]
    file: PathBuf,

    /// Owner recorded on every extracted record
    #[arg(long, default_value = "local")]
    owner: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write records as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Store the raw search for the next pipeline run
    #[arg(short, long)]
    store: bool,
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// Add a user, generating an ID when none is given
    Add {
        /// User ID
        id: Option<String>,
    },

    /// List users
    List,
}

#[derive(Args, Debug)]
struct RecordsArgs {
    /// Only show records of this user
    #[arg(long)]
    owner: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let _telemetry = telemetry::init_tracing_subscriber(config.logging.file.as_deref())?;

    match cli.command {
        Some(Commands::Extract(args)) => extract_command(args).await?,
        Some(Commands::Fetch(args)) => fetch_command(&config, args).await?,
        Some(Commands::Run) => run_command(&config).await?,
        Some(Commands::Users(command)) => users_command(&config, command).await?,
        Some(Commands::Records(args)) => records_command(&config, args).await?,
        None => {
            let _ = Cli::parse_from(["sift", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn extract_command(args: ExtractArgs) -> anyhow::Result<()> {
    let html = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let records = TreeExtractor::new().extract(&html, &args.owner);

    if let Some(output_file) = &args.output {
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(output_file, json).await?;
        println!(
            "Saved {} records to {}",
            records.len(),
            output_file.display()
        );
        return Ok(());
    }

    print_records(&records, args.format)
}

#[instrument(skip(config))]
async fn fetch_command(config: &Config, args: FetchArgs) -> anyhow::Result<()> {
    if config.search.user_id.is_empty() {
        return Err(anyhow!("search.user_id must be configured to fetch"));
    }

    let client = SearchClient::from_config(&config.search, config.retry.clone())?;
    println!("Searching for: {}", args.query);

    let payload = client.fetch(&args.query).await?;
    let html = result_html(&payload).map(str::to_string);

    match &html {
        Some(html) => {
            let records = TreeExtractor::new().extract(html, client.user_id());
            println!(
                "Received {} bytes of markup, {} results",
                html.len(),
                records.len()
            );
        }
        None => println!("Search returned no result page"),
    }

    if args.store {
        let db = open_database(config).await?;
        let search = SearchResult::new(client.user_id(), args.query.as_str(), html);
        db.insert_search(&search).await?;
        println!("Stored search {}", search.search_id);
    }

    Ok(())
}

#[instrument(skip(config))]
async fn run_command(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    let pipeline = EtlPipeline::new(db, TreeExtractor::new());

    let (progress_sender, mut progress_receiver) = mpsc::channel(8);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .map_err(|e| anyhow!("Invalid progress template: {}", e))?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Fetching searches...");

    let progress_handle = tokio::spawn({
        let spinner = spinner.clone();
        async move {
            while let Some(event) = progress_receiver.recv().await {
                let message = match event {
                    PipelineProgress::Fetched { users, searches } => {
                        format!("Extracting {} searches of {} users...", searches, users)
                    }
                    PipelineProgress::Extracted { records, skipped } => {
                        format!("Storing {} records ({} searches skipped)...", records, skipped)
                    }
                    PipelineProgress::Stored { records } => format!("Stored {} records", records),
                };
                spinner.set_message(message);
            }
        }
    });

    let start_time = std::time::Instant::now();
    let result = pipeline.run_with_progress(Some(progress_sender)).await;
    let _ = progress_handle.await;

    let report = match result {
        Ok(report) => {
            spinner.finish_with_message("Pipeline completed");
            report
        }
        Err(e) => {
            spinner.abandon_with_message("Pipeline failed");
            return Err(e.into());
        }
    };

    println!(
        "Processed {} searches for {} users in {:.2?}",
        report.searches,
        report.users,
        start_time.elapsed()
    );
    println!(
        "Extracted {} records, skipped {} searches without results",
        report.records, report.skipped
    );

    Ok(())
}

#[instrument(skip(config))]
async fn users_command(config: &Config, command: UsersCommand) -> anyhow::Result<()> {
    let db = open_database(config).await?;

    match command {
        UsersCommand::Add { id } => {
            let user = id.map(User::with_id).unwrap_or_default();
            db.insert_user(&user).await?;
            println!("Added user {}", user.user_id);
        }
        UsersCommand::List => {
            let users = db.fetch_all_users().await?;
            println!("Users: {}", users.len());
            for user in users {
                let last_run = db
                    .fetch_latest_status(&user.user_id)
                    .await?
                    .map(|status| status.last_run.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("{} (last extracted: {})", user.user_id, last_run);
            }
        }
    }

    Ok(())
}

#[instrument(skip(config))]
async fn records_command(config: &Config, args: RecordsArgs) -> anyhow::Result<()> {
    let db = open_database(config).await?;

    let records = match &args.owner {
        Some(owner) => db.fetch_extracted_for_user(owner).await?,
        None => db.fetch_all_extracted().await?,
    };

    print_records(&records, args.format)
}

async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::from_config(&config.database)
        .await?
        .with_retry_policy(config.retry.clone());
    Ok(db)
}

fn print_records(records: &[ExtractedRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Text => {
            println!("Found {} results", records.len());
            for (i, record) in records.iter().enumerate() {
                println!("{}. {}", i + 1, record.body);
                println!("   URL: {}", record.url);
                if !record.date.is_empty() {
                    println!("   Date: {}", record.date);
                }
                println!();
            }
        }
    }
    Ok(())
}
