use anyhow::{Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::agent::AgentSearch;
use crate::aggregate::Aggregator;
use crate::config::{Config, ProviderConfig};
use crate::fetch::{build_client, HttpPageFetcher, PageFetcher};
use crate::keywords::dedup_targets;
use crate::models::{ExecutionMode, KeywordTarget};
use crate::processed::ProcessedSources;
use crate::search::{BaiduSearch, GoogleSearch, SearchProvider};
use crate::table::FrequencyTable;

fn progress(done: usize, total: usize, keyword: &str) {
    let pct = if total == 0 { 100 } else { (done as f32 / total as f32 * 100.0) as u32 };
    info!("Keyword progress: {}/{} ({}%) | last={}", done, total, pct, keyword);
}

/// Run every target through the aggregator and collect the table in target order.
///
/// A keyword listed more than once runs only for its first listing.
pub async fn run_targets(
    aggregator: &Aggregator,
    targets: &[KeywordTarget],
    mode: ExecutionMode,
    keyword_delay: Duration,
) -> FrequencyTable {
    let targets = dedup_targets(targets.to_vec());
    let total = targets.len();
    let mut table = FrequencyTable::new();

    match mode {
        ExecutionMode::Sequential => {
            for (i, target) in targets.iter().enumerate() {
                if i > 0 && !keyword_delay.is_zero() {
                    let pause = keyword_delay.as_secs_f32();
                    debug!("Pausing between keywords - pause={:.1}s", pause);
                    tokio::time::sleep(keyword_delay).await;
                }
                let outcome = aggregator.aggregate(target).await;
                table.insert(target.keyword.clone(), outcome.entries);
                progress(i + 1, total, &target.keyword);
            }
        }
        ExecutionMode::Concurrent => {
            let done = AtomicUsize::new(0);
            let tasks = targets.iter().map(|target| {
                let done = &done;
                async move {
                    let outcome = aggregator.aggregate(target).await;
                    progress(done.fetch_add(1, Ordering::SeqCst) + 1, total, &target.keyword);
                    outcome
                }
            });
            let outcomes = futures::future::join_all(tasks).await;
            for (target, outcome) in targets.iter().zip(outcomes) {
                table.insert(target.keyword.clone(), outcome.entries);
            }
        }
    }
    table
}

fn build_search(cfg: &Config, client: &reqwest::Client) -> Arc<dyn SearchProvider> {
    let baidu = || BaiduSearch::new(client.clone()).with_endpoint(cfg.endpoints.baidu.as_str());
    match &cfg.provider {
        ProviderConfig::Google { api_key, cse_id } => Arc::new(
            GoogleSearch::new(client.clone(), api_key.clone(), cse_id.clone())
                .with_endpoint(cfg.endpoints.google.as_str()),
        ),
        ProviderConfig::Baidu => Arc::new(baidu()),
        ProviderConfig::Agent(llm) => {
            Arc::new(AgentSearch::new(client.clone(), llm.clone(), baidu()))
        }
    }
}

/// Full pipeline: load state, count every keyword, persist, hand back the table.
///
/// Persistence failures are logged; the in-memory table is returned regardless.
pub async fn run(cfg: &Config) -> Result<FrequencyTable> {
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - keywords={}, mode={:?}, max_results={}",
        cfg.targets.len(),
        cfg.mode,
        cfg.settings.max_results
    );

    let processed = match &cfg.processed_path {
        Some(path) => ProcessedSources::load(path)?,
        None => ProcessedSources::new(),
    }
    .shared();

    let client = build_client(cfg.fetch_timeout).context("building HTTP client")?;
    let search = build_search(cfg, &client);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(client));
    let aggregator = Aggregator::new(search, fetcher, processed.clone(), cfg.settings);

    let table = run_targets(&aggregator, &cfg.targets, cfg.mode, cfg.keyword_delay).await;

    if let Some(path) = &cfg.processed_path {
        if let Err(e) = processed.lock().await.save(path) {
            error!("Failed to save processed URLs - file={}, error={:#}", path.display(), e);
        }
    }

    match table.write_report(&cfg.report_path) {
        Ok(()) => info!("Report written - file={}", cfg.report_path.display()),
        Err(e) => error!(
            "Failed to write report - file={}, error={:#}",
            cfg.report_path.display(),
            e
        ),
    }

    info!(
        "Pipeline completed - total_duration={:.2}s, keywords={}, processed_urls={}",
        pipeline_start.elapsed().as_secs_f32(),
        table.len(),
        processed.lock().await.len()
    );
    Ok(table)
}
