use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::html::extract_text;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("unreadable body: {0}")]
    Body(String),
}

impl FetchError {
    /// Timeouts, connection trouble, 5xx and 429 are worth another try;
    /// any other non-2xx status is final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Transport(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 429,
            FetchError::Body(_) => false,
        }
    }
}

/// Maps a reqwest failure to its retry class. A body that breaks off
/// mid-stream is a connection problem and stays transient; only a body that
/// arrived but cannot be decoded is final.
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Turns a URL into visible page text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// GET a page with a browser user agent and strip it down to visible text.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// GET `url` and return the raw body, mapping non-2xx to `FetchError::Status`.
pub async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let start = std::time::Instant::now();
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp.text().await?;
    debug!(
        "GET completed - url={}, status={}, duration={:.2}s, bytes={}",
        url,
        status.as_u16(),
        start.elapsed().as_secs_f32(),
        body.len()
    );
    Ok(body)
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let body = get_text(&self.client, url).await?;
        Ok(extract_text(&body))
    }
}
