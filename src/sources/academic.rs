//! Semantic Scholar Graph API search.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PaperMeta, SearchResult, SearchSource, SourceError, SourceKind};
use crate::config::ResearchConfig;
use crate::text::{clip_chars, normalize_whitespace};

const SEARCH_FIELDS: &str = "title,authors,year,venue,url,abstract";
const MAX_AUTHORS: usize = 3;
const MAX_ABSTRACT_CHARS: usize = 1000;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    year: Option<u32>,
    venue: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Clone)]
pub struct SemanticScholarSource {
    http: Client,
    config: Arc<ResearchConfig>,
}

impl SemanticScholarSource {
    pub fn new(http: Client, config: Arc<ResearchConfig>) -> Self {
        Self { http, config }
    }

    async fn request(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let endpoint = format!("{}/paper/search", self.config.academic_api_url);
        let limit = max_results.to_string();
        let url = url::Url::parse_with_params(
            &endpoint,
            &[("query", query), ("limit", &limit), ("fields", SEARCH_FIELDS)],
        )
        .map_err(|e| SourceError::Parse(format!("bad search URL: {e}")))?;

        let mut builder = self
            .http
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "application/json")
            .timeout(self.config.search_timeout);
        if let Some(key) = &self.config.semantic_scholar_api_key {
            builder = builder.header("x-api-key", key.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Semantic Scholar rate limited");
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: S2SearchResponse =
            serde_json::from_str(&text).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(parse_papers(body.data, max_results))
    }
}

#[async_trait]
impl SearchSource for SemanticScholarSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Academic
    }

    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.request(query, max_results).await {
                Ok(results) => return Ok(results),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(attempt = attempt + 1, delay_ms, "retrying Semantic Scholar");
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(SourceError::RateLimited))
    }
}

/// Map raw records to results, skipping any that are malformed or untitled.
fn parse_papers(records: Vec<serde_json::Value>, max_results: usize) -> Vec<SearchResult> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<S2Paper>(record) {
            Ok(paper) => to_result(paper),
            Err(e) => {
                debug!(%e, "skipping malformed paper record");
                None
            }
        })
        .take(max_results)
        .collect()
}

fn to_result(paper: S2Paper) -> Option<SearchResult> {
    let title = normalize_whitespace(paper.title.as_deref()?);
    if title.is_empty() {
        return None;
    }

    let names: Vec<String> = paper
        .authors
        .into_iter()
        .filter_map(|a| a.name)
        .map(|n| normalize_whitespace(&n))
        .filter(|n| !n.is_empty())
        .collect();
    let more_authors = names.len() > MAX_AUTHORS;

    let meta = PaperMeta {
        authors: names.into_iter().take(MAX_AUTHORS).collect(),
        more_authors,
        year: paper.year,
        venue: paper
            .venue
            .map(|v| normalize_whitespace(&v))
            .filter(|v| !v.is_empty()),
    };

    let snippet = paper
        .abstract_text
        .map(|a| clip_chars(&normalize_whitespace(&a), MAX_ABSTRACT_CHARS))
        .unwrap_or_default();

    Some(SearchResult {
        title,
        url: paper.url.filter(|u| !u.trim().is_empty()),
        snippet,
        kind: SourceKind::Academic,
        paper: Some(meta),
    })
}

fn is_retriable(e: &SourceError) -> bool {
    matches!(
        e,
        SourceError::RateLimited | SourceError::Timeout | SourceError::Status(500..=599)
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}
