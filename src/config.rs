use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::{LlmConfig, DEFAULT_LLM_BASE, DEFAULT_LLM_MODEL, DEFAULT_LLM_TIMEOUT};
use crate::aggregate::{AggregatorSettings, RateLimit};
use crate::keywords::{default_targets, load_keyword_tsv, load_targets_json};
use crate::models::{Boundary, ExecutionMode, KeywordTarget};
use crate::retry::RetryPolicy;
use crate::search::{BAIDU_ENDPOINT, GOOGLE_CSE_ENDPOINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    /// Google Custom Search; counts fetched pages.
    Google,
    /// Baidu result page; counts titles and abstracts.
    Baidu,
    /// LLM agent picks URLs from a scraped result page; counts fetched pages.
    Agent,
}

/// Resolved credentials for the chosen provider.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Google { api_key: String, cse_id: String },
    Baidu,
    Agent(LlmConfig),
}

impl ProviderConfig {
    /// Read credentials through `env`. Missing required values are fatal.
    pub fn from_env(kind: ProviderKind, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            match env(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => Ok(v),
                None => bail!(
                    "{} is not set (environment or .env) but --provider {:?} needs it",
                    name,
                    kind
                ),
            }
        };
        Ok(match kind {
            ProviderKind::Google => ProviderConfig::Google {
                api_key: required("GOOGLE_API_KEY")?,
                cse_id: required("GOOGLE_CSE_ID")?,
            },
            ProviderKind::Baidu => ProviderConfig::Baidu,
            ProviderKind::Agent => ProviderConfig::Agent(LlmConfig {
                api_key: required("OPENAI_API_KEY")?,
                api_base: env("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE.to_string()),
                model: env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: match env("OPENAI_TIMEOUT_SECS") {
                    Some(v) => v
                        .trim()
                        .parse()
                        .map(Duration::from_secs)
                        .with_context(|| format!("OPENAI_TIMEOUT_SECS is not a number: {}", v))?,
                    None => DEFAULT_LLM_TIMEOUT,
                },
            }),
        })
    }
}

/// Base URLs of the search backends. Overridable through the environment so
/// runs can be pointed at a mirror or a local stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub google: String,
    pub baidu: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            google: GOOGLE_CSE_ENDPOINT.to_string(),
            baidu: BAIDU_ENDPOINT.to_string(),
        }
    }
}

impl Endpoints {
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            google: env("GOOGLE_CSE_ENDPOINT").unwrap_or(defaults.google),
            baidu: env("BAIDU_SEARCH_ENDPOINT").unwrap_or(defaults.baidu),
        }
    }
}

/// Where the keyword list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    Builtin,
    TargetsJson(PathBuf),
    KeywordTsv(PathBuf),
}

impl TargetSource {
    pub fn load(&self) -> Result<Vec<KeywordTarget>> {
        match self {
            TargetSource::Builtin => Ok(default_targets()),
            TargetSource::TargetsJson(p) => load_targets_json(p),
            TargetSource::KeywordTsv(p) => load_keyword_tsv(p),
        }
    }
}

/// Everything a run needs, resolved before any network activity.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub endpoints: Endpoints,
    pub targets: Vec<KeywordTarget>,
    pub mode: ExecutionMode,
    pub settings: AggregatorSettings,
    /// Pause between keywords in sequential mode.
    pub keyword_delay: Duration,
    pub fetch_timeout: Duration,
    /// `None` disables loading and saving the processed-URL set.
    pub processed_path: Option<PathBuf>,
    pub report_path: PathBuf,
}

/// Raw knobs as they arrive from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub provider: ProviderKind,
    pub targets: TargetSource,
    pub mode: ExecutionMode,
    pub max_results: usize,
    pub page_boundary: Boundary,
    pub fetch_delay_ms: u64,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub keyword_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub retry_attempts: u32,
    pub processed_path: Option<PathBuf>,
    pub report_path: PathBuf,
}

impl Config {
    pub fn resolve(opts: RunOptions, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = ProviderConfig::from_env(opts.provider, &env)?;
        let endpoints = Endpoints::from_env(&env);
        let targets = opts.targets.load()?;
        if opts.max_results == 0 {
            bail!("--results must be at least 1");
        }

        let settings = AggregatorSettings {
            max_results: opts.max_results,
            page_boundary: opts.page_boundary,
            rate: RateLimit {
                fetch_delay: Duration::from_millis(opts.fetch_delay_ms),
                batch_size: opts.batch_size,
                batch_pause: Duration::from_millis(opts.batch_pause_ms),
            },
            retry: RetryPolicy {
                max_attempts: opts.retry_attempts.max(1),
                ..RetryPolicy::default()
            },
        };

        Ok(Config {
            provider,
            endpoints,
            targets,
            mode: opts.mode,
            settings,
            keyword_delay: Duration::from_millis(opts.keyword_delay_ms),
            fetch_timeout: Duration::from_secs(opts.fetch_timeout_secs.max(1)),
            processed_path: opts.processed_path,
            report_path: opts.report_path,
        })
    }
}
