use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use variant_tally::config::{Config, ProviderKind, RunOptions, TargetSource};
use variant_tally::fetch::DEFAULT_FETCH_TIMEOUT;
use variant_tally::models::{Boundary, ExecutionMode};
use variant_tally::orchestrator::run;

/// Variant Tally - which spelling of a keyword wins on the live web
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Search provider used to acquire sources
    #[arg(short, long, value_enum, default_value_t = ProviderKind::Google)]
    provider: ProviderKind,

    /// JSON file mapping each keyword to its declared variants
    #[arg(short, long, conflicts_with = "keywords")]
    targets: Option<PathBuf>,

    /// Tab-separated keyword file (header line, keyword in first column); discovery mode
    #[arg(short, long)]
    keywords: Option<PathBuf>,

    /// Run keywords one after another or as concurrent tasks
    #[arg(short, long, value_enum, default_value_t = ExecutionMode::Sequential)]
    mode: ExecutionMode,

    /// Number of search results to process per keyword
    #[arg(short = 'n', long, default_value_t = 10)]
    results: usize,

    /// Anchoring of exact matches in fetched page text
    #[arg(long, value_enum, default_value_t = Boundary::Word)]
    page_boundary: Boundary,

    /// Delay between page fetches within one keyword (milliseconds)
    #[arg(long, default_value_t = 500)]
    fetch_delay_ms: u64,

    /// Take a longer pause after this many fetches
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Length of the longer pause (milliseconds)
    #[arg(long, default_value_t = 5000)]
    batch_pause_ms: u64,

    /// Pause between keywords in sequential mode (milliseconds)
    #[arg(long, default_value_t = 5000)]
    keyword_delay_ms: u64,

    /// Per-fetch timeout (seconds)
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    fetch_timeout: u64,

    /// Attempts per page for transient failures
    #[arg(long, default_value_t = 3)]
    retry_attempts: u32,

    /// Processed-URL file, loaded at start and saved at the end
    #[arg(long, default_value = "processed_urls.json")]
    processed: PathBuf,

    /// Do not load or save the processed-URL file
    #[arg(long)]
    no_processed: bool,

    /// Output report file
    #[arg(short, long, default_value = "frequency_table.json")]
    output: PathBuf,
}

impl Args {
    fn into_options(self) -> RunOptions {
        let targets = match (self.targets, self.keywords) {
            (Some(p), _) => TargetSource::TargetsJson(p),
            (None, Some(p)) => TargetSource::KeywordTsv(p),
            (None, None) => TargetSource::Builtin,
        };
        RunOptions {
            provider: self.provider,
            targets,
            mode: self.mode,
            max_results: self.results,
            page_boundary: self.page_boundary,
            fetch_delay_ms: self.fetch_delay_ms,
            batch_size: self.batch_size,
            batch_pause_ms: self.batch_pause_ms,
            keyword_delay_ms: self.keyword_delay_ms,
            fetch_timeout_secs: self.fetch_timeout,
            retry_attempts: self.retry_attempts,
            processed_path: (!self.no_processed).then_some(self.processed),
            report_path: self.output,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting variant_tally");

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    let args = Args::parse();
    let opts = args.into_options();

    // Credentials and keyword files are checked before any request goes out.
    let cfg = Config::resolve(opts, |name| std::env::var(name).ok())?;

    let table = run(&cfg).await?;
    println!("\n{}", table.render());
    Ok(())
}
