use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::api_types::CseResponse;
use crate::fetch::get_text;
use crate::models::Source;
use crate::normalize::collapse_whitespace;

pub const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const BAIDU_ENDPOINT: &str = "https://www.baidu.com/s";

/// Something that turns a keyword into candidate sources.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<Source>>;
}

/// Google Custom Search: ranked result links, fetched later page by page.
pub struct GoogleSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
}

impl GoogleSearch {
    pub fn new(client: Client, api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: GOOGLE_CSE_ENDPOINT.to_string(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<Source>> {
        // The API refuses num outside 1..=10.
        let num = max_results.clamp(1, 10).to_string();
        let start = std::time::Instant::now();

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", keyword),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Google search request failed for {:?}", keyword))?
            .error_for_status()
            .with_context(|| format!("Google search HTTP error for {:?}", keyword))?;

        let body: CseResponse = resp
            .json()
            .await
            .with_context(|| format!("Decoding Google search JSON for {:?}", keyword))?;

        let sources: Vec<Source> = body
            .items
            .into_iter()
            .take(max_results)
            .map(|item| Source::Page { url: item.link })
            .collect();

        info!(
            "Google search completed - keyword={}, duration={:.2}s, results={}",
            keyword,
            start.elapsed().as_secs_f32(),
            sources.len()
        );
        Ok(sources)
    }
}

/// Baidu result-page scraping: titles and abstracts only, no page fetches.
pub struct BaiduSearch {
    client: Client,
    endpoint: String,
}

impl BaiduSearch {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: BAIDU_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn result_page(&self, keyword: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("wd", keyword)])
            .with_context(|| format!("invalid search endpoint {}", self.endpoint))?;
        let html = get_text(&self.client, url.as_str())
            .await
            .with_context(|| format!("Baidu search failed for {:?}", keyword))?;
        Ok(html)
    }
}

#[async_trait]
impl SearchProvider for BaiduSearch {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<Source>> {
        let start = std::time::Instant::now();
        let html = self.result_page(keyword).await?;
        let sources = parse_baidu_results(&html, max_results);
        info!(
            "Baidu search completed - keyword={}, duration={:.2}s, results={}",
            keyword,
            start.elapsed().as_secs_f32(),
            sources.len()
        );
        Ok(sources)
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Pull (title, abstract) pairs out of a Baidu result page.
pub fn parse_baidu_results(html: &str, max_results: usize) -> Vec<Source> {
    let doc = Html::parse_document(html);
    let result_sel = selector("div.result, div.result-op, div.c-container");
    let title_sel = selector("h3");
    let abstract_sel = selector(".c-abstract, .content-right_8Zs40, .c-span-last, .c-color-text");

    let mut out = Vec::new();
    for block in doc.select(&result_sel) {
        if out.len() >= max_results {
            break;
        }
        let Some(title) = block.select(&title_sel).next().map(element_text) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let abstract_text = block
            .select(&abstract_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        out.push(Source::Snippet { title, abstract_text });
    }
    debug!("Parsed Baidu results - containers_kept={}", out.len());
    out
}
