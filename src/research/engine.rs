use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::report::{self, Finding};
use super::{Query, ResearchError};
use crate::config::ResearchConfig;
use crate::fetch::PageFetcher;
use crate::fetch::extractor::{self, ExtractedContent};
use crate::sources::{SearchResult, SearchSource, SourceKind};

/// Runs one research invocation end to end. Holds no per-call state, so a
/// single instance serves concurrent calls.
pub struct Researcher<F> {
    sources: Vec<Arc<dyn SearchSource>>,
    fetcher: F,
    config: Arc<ResearchConfig>,
}

impl<F: PageFetcher> Researcher<F> {
    /// `sources` order fixes the interleave order of the final document.
    pub fn new(sources: Vec<Arc<dyn SearchSource>>, fetcher: F, config: Arc<ResearchConfig>) -> Self {
        Self {
            sources,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Search, fetch and extract, then render the bounded document.
    ///
    /// Backend and page failures degrade the output; they never fail the call.
    pub async fn run(&self, query: &Query) -> Result<String, ResearchError> {
        let active: Vec<&Arc<dyn SearchSource>> = self
            .sources
            .iter()
            .filter(|s| query.sources.includes(s.kind()))
            .collect();
        if active.is_empty() {
            return Err(ResearchError::Internal(format!(
                "no search backend configured for {}",
                query.sources.describe()
            )));
        }

        let listings = join_all(
            active
                .iter()
                .map(|s| s.search(&query.text, query.max_results)),
        )
        .await;

        let mut unavailable: Vec<SourceKind> = Vec::new();
        let mut per_source = Vec::with_capacity(listings.len());
        for (source, mut results) in active.iter().zip(listings) {
            results.truncate(query.max_results);
            if results.is_empty() {
                warn!(source = source.name(), "source unavailable");
                unavailable.push(source.kind());
            }
            per_source.push(results);
        }

        let candidates = interleave(per_source);
        debug!(candidates = candidates.len(), "examining candidates");

        let findings: Vec<Finding> = stream::iter(candidates)
            .map(|result| async move {
                let content = self.examine(&result).await;
                Finding { result, content }
            })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let extracted = findings.iter().filter(|f| f.content.success).count();
        let document = report::render(
            &query.text,
            query.sources,
            &findings,
            &unavailable,
            self.config.max_content_size,
        );

        info!(
            results = findings.len(),
            extracted,
            unavailable = unavailable.len(),
            chars = document.len(),
            "research complete"
        );
        Ok(document)
    }

    async fn examine(&self, result: &SearchResult) -> ExtractedContent {
        let Some(url) = result.url.as_deref() else {
            return ExtractedContent::failed();
        };
        match self.fetcher.fetch(url).await {
            Ok(page) => {
                debug!(url = %page.url, status = page.status, content_type = ?page.content_type, "extracting page");
                extractor::extract(&page.url, &page.body, self.config.max_chars_per_result)
            }
            Err(e) => {
                warn!(url, error = %e, "fetch failed, falling back to snippet");
                ExtractedContent::failed()
            }
        }
    }
}

/// Round-robin merge: first of each source in source order, then second, ...
fn interleave(lists: Vec<Vec<SearchResult>>) -> Vec<SearchResult> {
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::new();
    loop {
        let before = merged.len();
        for it in &mut iters {
            if let Some(r) = it.next() {
                merged.push(r);
            }
        }
        if merged.len() == before {
            return merged;
        }
    }
}
