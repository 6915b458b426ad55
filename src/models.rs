use serde::{Deserialize, Serialize};

/// One tracked keyword and the spellings we count for it.
///
/// An empty `variants` list switches the keyword to discovery mode: every
/// case-insensitive surface form found in the text is reported instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTarget {
    pub keyword: String,
    pub variants: Vec<String>,
}

impl KeywordTarget {
    pub fn new(keyword: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            keyword: keyword.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn discovery(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            variants: Vec::new(),
        }
    }

    pub fn is_discovery(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A unit of retrieved text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Search-result title + abstract; no identity, never deduplicated.
    Snippet { title: String, abstract_text: String },
    /// A page that still has to be fetched; identified by its URL string.
    Page { url: String },
}

impl Source {
    pub fn url(&self) -> Option<&str> {
        match self {
            Source::Page { url } => Some(url),
            Source::Snippet { .. } => None,
        }
    }
}

/// A single `[variant, count]` row of the frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, u64)", into = "(String, u64)")]
pub struct FrequencyEntry {
    pub variant: String,
    pub count: u64,
}

impl FrequencyEntry {
    pub fn new(variant: impl Into<String>, count: u64) -> Self {
        Self {
            variant: variant.into(),
            count,
        }
    }
}

impl From<(String, u64)> for FrequencyEntry {
    fn from((variant, count): (String, u64)) -> Self {
        Self { variant, count }
    }
}

impl From<FrequencyEntry> for (String, u64) {
    fn from(e: FrequencyEntry) -> Self {
        (e.variant, e.count)
    }
}

/// How strictly exact-variant matches are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Boundary {
    /// `\b`-anchored: a match must not be part of a larger token.
    #[default]
    Word,
    /// Plain substring search.
    Unanchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExecutionMode {
    /// One keyword at a time, pausing between keywords.
    #[default]
    Sequential,
    /// One task per keyword, sharing the processed-URL set.
    Concurrent,
}
