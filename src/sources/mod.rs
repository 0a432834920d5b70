//! Search backends: one adapter per engine, all behind [`SearchSource`].

pub mod academic;
pub mod web;

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

pub use academic::SemanticScholarSource;
pub use web::DuckDuckGoSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Web,
    Academic,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Web => f.write_str("web"),
            SourceKind::Academic => f.write_str("academic"),
        }
    }
}

/// Which backends a research call should consult.
#[derive(Debug, Deserialize, JsonSchema, ValueEnum, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelector {
    Web,
    Academic,
    #[default]
    Both,
}

impl SourceSelector {
    pub fn includes(self, kind: SourceKind) -> bool {
        match self {
            SourceSelector::Both => true,
            SourceSelector::Web => kind == SourceKind::Web,
            SourceSelector::Academic => kind == SourceKind::Academic,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SourceSelector::Web => "web sources",
            SourceSelector::Academic => "academic sources",
            SourceSelector::Both => "web and academic sources",
        }
    }
}

/// Bibliographic details carried only by academic results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperMeta {
    pub authors: Vec<String>,
    /// True when the backend listed more authors than were kept.
    pub more_authors: bool,
    pub year: Option<u32>,
    pub venue: Option<String>,
}

impl PaperMeta {
    /// `A, B, C, et al. (2021) - Venue`, omitting whatever is missing.
    pub fn citation(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.authors.is_empty() {
            let mut names = self.authors.join(", ");
            if self.more_authors {
                names.push_str(", et al.");
            }
            parts.push(names);
        }
        if let Some(year) = self.year {
            parts.push(format!("({year})"));
        }
        let mut line = parts.join(" ");
        if let Some(venue) = self.venue.as_deref().filter(|v| !v.is_empty()) {
            if line.is_empty() {
                line.push_str(venue);
            } else {
                line.push_str(" - ");
                line.push_str(venue);
            }
        }
        if line.is_empty() { None } else { Some(line) }
    }
}

/// One candidate returned by a backend, in the backend's own ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub kind: SourceKind,
    pub paper: Option<PaperMeta>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("backend rate limit exceeded")]
    RateLimited,

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("unparsable response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Network(e)
        }
    }
}

/// A search backend. New engines plug in by implementing `try_search`;
/// the pipeline only ever calls `search`, which never fails.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn name(&self) -> &'static str;

    /// Query the backend for at most `max_results` candidates.
    async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError>;

    /// Like `try_search`, but a failing backend yields an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        match self.try_search(query, max_results).await {
            Ok(mut results) => {
                results.truncate(max_results);
                info!(source = self.name(), results = results.len(), "search complete");
                results
            }
            Err(e) => {
                warn!(source = self.name(), error = %e, "search failed, treating source as unavailable");
                Vec::new()
            }
        }
    }
}
