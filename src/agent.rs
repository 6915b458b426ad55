use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::api_types::{ChatMessage, ChatRequest, ChatResponse};
use crate::html::extract_text;
use crate::models::Source;
use crate::prompts::{system_search_agent, user_search_agent};
use crate::search::{BaiduSearch, SearchProvider};

pub const DEFAULT_LLM_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
/// Completions take far longer than page fetches, so the chat request
/// overrides the shared client's timeout.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

// Keeps the prompt well inside small-model context windows.
const MAX_TOOL_CHARS: usize = 12_000;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("static regex"));

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

pub async fn llm_call(
    client: &Client,
    cfg: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String> {
    let start = std::time::Instant::now();

    debug!("LLM call starting - prompt_length={} chars", user.len());

    let req = ChatRequest {
        model: &cfg.model,
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        temperature: 0.0,
    };
    let url = format!("{}/chat/completions", cfg.api_base.trim_end_matches('/'));
    let resp: ChatResponse = client
        .post(&url)
        .bearer_auth(&cfg.api_key)
        .timeout(cfg.timeout)
        .json(&req)
        .send()
        .await
        .with_context(|| format!("Request failed for {}", url))?
        .error_for_status()
        .with_context(|| format!("HTTP error for {}", url))?
        .json()
        .await
        .with_context(|| format!("Decoding chat completion from {}", url))?;

    let answer = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("chat completion had no content"))?;

    info!(
        "LLM API call completed - duration={:.2}s, response_length={} chars",
        start.elapsed().as_secs_f32(),
        answer.len()
    );
    Ok(answer)
}

/// Scan free text for URLs, dropping trailing punctuation and anything
/// that does not parse.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')', ']', '>', '"', '\'', '`']))
        .filter(|s| Url::parse(s).is_ok())
        .map(str::to_string)
        .collect()
}

/// Agent-driven search: the search page is scraped as tool output, the LLM
/// picks URLs from it, and those URLs become page sources.
pub struct AgentSearch {
    client: Client,
    llm: LlmConfig,
    scraper: BaiduSearch,
}

impl AgentSearch {
    pub fn new(client: Client, llm: LlmConfig, scraper: BaiduSearch) -> Self {
        Self { client, llm, scraper }
    }
}

#[async_trait]
impl SearchProvider for AgentSearch {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<Source>> {
        let query = format!("\"{}\"", keyword);
        let page = self.scraper.result_page(&query).await?;
        let tool_output: String = extract_text(&page).chars().take(MAX_TOOL_CHARS).collect();

        let user = user_search_agent(&query, &tool_output, max_results);
        let answer = llm_call(&self.client, &self.llm, &system_search_agent(), &user).await?;

        let urls = extract_urls(&answer);
        debug!("Agent answer scanned - keyword={}, urls_found={}", keyword, urls.len());
        Ok(urls
            .into_iter()
            .take(max_results)
            .map(|url| Source::Page { url })
            .collect())
    }
}
