use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::fetch::PageFetcher;
use crate::matcher::{count_variants, discover_variants, sort_by_count};
use crate::models::{Boundary, FrequencyEntry, KeywordTarget, Source};
use crate::normalize::{collapse_whitespace, normalize_snippets};
use crate::processed::SharedProcessed;
use crate::retry::{with_retry, RetryPolicy};
use crate::search::SearchProvider;

/// Pacing between page fetches for one keyword.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub fetch_delay: Duration,
    /// Every `batch_size` requests, sleep `batch_pause` on top of the delay.
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            fetch_delay: Duration::from_millis(500),
            batch_size: 10,
            batch_pause: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorSettings {
    pub max_results: usize,
    /// Anchoring for exact matches in fetched page text. Snippets are always
    /// matched unanchored.
    pub page_boundary: Boundary,
    pub rate: RateLimit,
    pub retry: RetryPolicy,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            page_boundary: Boundary::Word,
            rate: RateLimit::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub snippets: usize,
    pub fetched: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    pub search_failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordOutcome {
    pub entries: Vec<FrequencyEntry>,
    pub stats: AggregateStats,
}

/// Running per-variant totals, in first-seen order.
#[derive(Default)]
struct Tally {
    entries: Vec<FrequencyEntry>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, entries: Vec<FrequencyEntry>) {
        for e in entries {
            match self.index.get(&e.variant) {
                Some(&i) => self.entries[i].count += e.count,
                None => {
                    self.index.insert(e.variant.clone(), self.entries.len());
                    self.entries.push(e);
                }
            }
        }
    }

    fn get(&self, variant: &str) -> u64 {
        self.index.get(variant).map(|&i| self.entries[i].count).unwrap_or(0)
    }

    /// Declared variants in declared order, zero-filled; discovery results
    /// sorted by total.
    fn finish(mut self, target: &KeywordTarget) -> Vec<FrequencyEntry> {
        if target.is_discovery() {
            sort_by_count(&mut self.entries);
            return self.entries;
        }
        target
            .variants
            .iter()
            .map(|v| FrequencyEntry::new(v.as_str(), self.get(v)))
            .collect()
    }
}

fn match_text(text: &str, target: &KeywordTarget, boundary: Boundary) -> Vec<FrequencyEntry> {
    let res = if target.is_discovery() {
        discover_variants(text, &target.keyword)
    } else {
        count_variants(text, &target.variants, boundary)
    };
    res.unwrap_or_else(|e| {
        warn!("Matching failed, counting as empty - keyword={}, error={}", target.keyword, e);
        Vec::new()
    })
}

/// Drives acquisition, fetching and counting for one keyword at a time.
pub struct Aggregator {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    processed: SharedProcessed,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        processed: SharedProcessed,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            search,
            fetcher,
            processed,
            settings,
        }
    }

    pub async fn aggregate(&self, target: &KeywordTarget) -> KeywordOutcome {
        let start = std::time::Instant::now();
        let mut stats = AggregateStats::default();
        let mut tally = Tally::default();

        info!(
            "Processing keyword - keyword={}, variants={:?}, max_results={}",
            target.keyword, target.variants, self.settings.max_results
        );

        // 1) acquire candidates; a failed search empties this keyword only
        let sources = match self.search.search(&target.keyword, self.settings.max_results).await {
            Ok(s) => s,
            Err(e) => {
                error!("Search failed - keyword={}, error={:#}", target.keyword, e);
                stats.search_failed = true;
                return KeywordOutcome {
                    entries: tally.finish(target),
                    stats,
                };
            }
        };

        // 2) snippets have no identity: flatten them into one blob
        let mut snippet_parts: Vec<&str> = Vec::new();
        let mut urls: Vec<&str> = Vec::new();
        for source in sources.iter().take(self.settings.max_results) {
            match source {
                Source::Snippet { title, abstract_text } => {
                    snippet_parts.push(title);
                    snippet_parts.push(abstract_text);
                    stats.snippets += 1;
                }
                Source::Page { url } => urls.push(url),
            }
        }
        if !snippet_parts.is_empty() {
            let text = normalize_snippets(&snippet_parts);
            tally.add(match_text(&text, target, Boundary::Unanchored));
        }

        // 3) pages: claim, fetch with retry, count
        let rate = self.settings.rate;
        let mut requests = 0usize;
        for url in urls {
            let claimed = self.processed.lock().await.claim(url);
            if !claimed {
                info!("Skipping already processed URL - keyword={}, url={}", target.keyword, url);
                stats.skipped_duplicate += 1;
                continue;
            }

            if requests > 0 {
                if rate.batch_size > 0 && requests % rate.batch_size == 0 {
                    let pause = rate.batch_pause.as_secs_f32();
                    info!("Sleeping to avoid rate limiting - pause={:.1}s", pause);
                    tokio::time::sleep(rate.batch_pause).await;
                }
                tokio::time::sleep(rate.fetch_delay).await;
            }
            requests += 1;

            let fetched = with_retry(&self.settings.retry, url, || self.fetcher.fetch(url)).await;
            match fetched {
                Ok(text) => {
                    let text = collapse_whitespace(&text);
                    tally.add(match_text(&text, target, self.settings.page_boundary));
                    stats.fetched += 1;
                    debug!(
                        "Counted page - keyword={}, url={}, chars={}",
                        target.keyword,
                        url,
                        text.len()
                    );
                }
                Err(e) => {
                    error!("Error fetching content - url={}, error={}", url, e);
                    stats.failed += 1;
                }
            }
        }

        let entries = tally.finish(target);
        info!(
            "Keyword completed - keyword={}, duration={:.2}s, snippets={}, fetched={}, \
             skipped={}, failed={}",
            target.keyword,
            start.elapsed().as_secs_f32(),
            stats.snippets,
            stats.fetched,
            stats.skipped_duplicate,
            stats.failed
        );
        KeywordOutcome { entries, stats }
    }
}
