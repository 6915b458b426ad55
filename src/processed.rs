use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::persist::write_atomic;

/// Shared handle used by concurrently running keyword tasks.
pub type SharedProcessed = Arc<Mutex<ProcessedSources>>;

/// URLs that have already been counted. Keys are compared verbatim:
/// a trailing slash or query string makes a different source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessedSources {
    urls: HashSet<String>,
}

impl ProcessedSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedProcessed {
        Arc::new(Mutex::new(self))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn add(&mut self, url: impl Into<String>) {
        self.urls.insert(url.into());
    }

    /// Check-and-add in one step. Returns `true` when the URL was unseen and
    /// the caller now owns counting it.
    pub fn claim(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Load a JSON array of URLs. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No processed-URL file at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading processed URLs from {}", path.display()))?;
        let urls: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("decoding processed URLs in {}", path.display()))?;
        info!("Processed URLs loaded - file={}, urls={}", path.display(), urls.len());
        Ok(Self {
            urls: urls.into_iter().collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut urls: Vec<&String> = self.urls.iter().collect();
        urls.sort();
        write_atomic(path, &serde_json::to_vec_pretty(&urls)?)?;
        info!("Processed URLs saved - file={}, urls={}", path.display(), urls.len());
        Ok(())
    }
}

impl FromIterator<String> for ProcessedSources {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}
