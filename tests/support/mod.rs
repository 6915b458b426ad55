#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use variant_tally::aggregate::{AggregatorSettings, RateLimit};
use variant_tally::fetch::{FetchError, PageFetcher};
use variant_tally::models::{Boundary, Source};
use variant_tally::retry::RetryPolicy;
use variant_tally::search::SearchProvider;

/// Returns canned sources per keyword; unknown keywords fail.
#[derive(Default)]
pub struct FakeSearch {
    pub results: HashMap<String, Vec<Source>>,
}

impl FakeSearch {
    pub fn with(mut self, keyword: &str, sources: Vec<Source>) -> Self {
        self.results.insert(keyword.to_string(), sources);
        self
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<Source>> {
        let sources = self
            .results
            .get(keyword)
            .ok_or_else(|| anyhow!("search backend refused {:?}", keyword))?;
        Ok(sources.iter().take(max_results).cloned().collect())
    }
}

/// Serves page text per URL, optionally failing a scripted number of times first.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn fail_first(self, url: &str, errors: Vec<FetchError>) -> Self {
        self.failures.lock().unwrap().insert(url.to_string(), errors.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        if let Some(err) = scripted {
            return Err(err);
        }
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }
}

pub fn page(url: &str) -> Source {
    Source::Page { url: url.to_string() }
}

pub fn snippet(title: &str, abstract_text: &str) -> Source {
    Source::Snippet {
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
    }
}

/// No pacing, immediate retries; timing-sensitive tests override fields.
pub fn fast_settings() -> AggregatorSettings {
    AggregatorSettings {
        max_results: 10,
        page_boundary: Boundary::Word,
        rate: RateLimit {
            fetch_delay: Duration::ZERO,
            batch_size: 10,
            batch_pause: Duration::ZERO,
        },
        retry: RetryPolicy {
            max_attempts: 3,
            multiplier: 1.0,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        },
    }
}

pub fn pairs(entries: &[variant_tally::models::FrequencyEntry]) -> Vec<(String, u64)> {
    entries.iter().map(|e| (e.variant.clone(), e.count)).collect()
}
