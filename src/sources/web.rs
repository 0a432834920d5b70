//! DuckDuckGo HTML search. Needs no API key; results are scraped from the
//! `html.duckduckgo.com` listing, so every selector is treated as optional.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{SearchResult, SearchSource, SourceError, SourceKind};
use crate::config::ResearchConfig;
use crate::text::{clip_chars, normalize_whitespace};

const MAX_TITLE_CHARS: usize = 100;
const MAX_SNIPPET_CHARS: usize = 300;

struct ListingSelectors {
    result: Selector,
    title_link: Selector,
    snippet: Selector,
}

static SELECTORS: LazyLock<Option<ListingSelectors>> = LazyLock::new(|| {
    Some(ListingSelectors {
        result: Selector::parse(".result").ok()?,
        title_link: Selector::parse(".result__title a, a.result__a").ok()?,
        snippet: Selector::parse(".result__snippet").ok()?,
    })
});

#[derive(Clone)]
pub struct DuckDuckGoSource {
    http: Client,
    config: Arc<ResearchConfig>,
}

impl DuckDuckGoSource {
    pub fn new(http: Client, config: Arc<ResearchConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SearchSource for DuckDuckGoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let url = url::Url::parse_with_params(&self.config.web_search_url, &[("q", query)])
            .map_err(|e| SourceError::Parse(format!("bad search URL: {e}")))?;

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .timeout(self.config.search_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let results = parse_results(&html, max_results);
        debug!(parsed = results.len(), bytes = html.len(), "duckduckgo listing parsed");
        Ok(results)
    }
}

/// Parse the HTML listing. Entries without a usable title or link are
/// skipped individually; a missing snippet leaves the snippet empty.
fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let Some(sel) = SELECTORS.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&sel.result)
        .filter(|block| !is_ad(block))
        .filter_map(|block| parse_block(sel, &block))
        .take(max_results)
        .collect()
}

fn parse_block(sel: &ListingSelectors, block: &ElementRef<'_>) -> Option<SearchResult> {
    let link = block.select(&sel.title_link).next()?;
    let title = normalize_whitespace(&link.text().collect::<String>());
    let url = resolve_href(link.value().attr("href")?)?;
    if title.is_empty() {
        return None;
    }

    let snippet = block
        .select(&sel.snippet)
        .next()
        .map(|s| normalize_whitespace(&s.text().collect::<String>()))
        .unwrap_or_default();

    Some(SearchResult {
        title: clip_chars(&title, MAX_TITLE_CHARS),
        url: Some(url),
        snippet: clip_chars(&snippet, MAX_SNIPPET_CHARS),
        kind: SourceKind::Web,
        paper: None,
    })
}

fn is_ad(block: &ElementRef<'_>) -> bool {
    block.value().classes().any(|c| c == "result--ad")
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn resolve_href(href: &str) -> Option<String> {
    if let Some(pos) = href.find("uddg=") {
        let encoded = href[pos + 5..].split('&').next().unwrap_or("");
        let decoded = percent_decode_str(encoded).decode_utf8().ok()?.into_owned();
        return is_http(&decoded).then_some(decoded);
    }
    is_http(href).then(|| href.to_string())
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r##"
<html><body>
<div class="result results_links result--ad">
  <h2 class="result__title"><a class="result__a" href="https://ads.example.com">Sponsored</a></h2>
  <a class="result__snippet">Buy now</a>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FQuantum_computing&amp;rut=abc">Quantum   computing - Wikipedia</a>
  </h2>
  <a class="result__snippet" href="#">A <b>quantum</b> computer exploits
     quantum mechanical phenomena.</a>
</div>
<div class="result results_links">
  <h2 class="result__title"><a class="result__a">No link here</a></h2>
</div>
<div class="result results_links">
  <h2 class="result__title"><a class="result__a" href="https://www.ibm.com/topics/quantum-computing">What is quantum computing? | IBM</a></h2>
</div>
<div class="result results_links">
  <h2 class="result__title"><a class="result__a" href="https://third.example.org/">Third</a></h2>
  <a class="result__snippet">third snippet</a>
</div>
</body></html>"##;

    #[test]
    fn parses_results_and_skips_malformed() {
        let results = parse_results(LISTING, 10);
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Quantum computing - Wikipedia");
        assert_eq!(
            results[0].url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Quantum_computing")
        );
        assert_eq!(
            results[0].snippet,
            "A quantum computer exploits quantum mechanical phenomena."
        );
        assert_eq!(results[0].kind, SourceKind::Web);
        assert!(results[0].paper.is_none());

        assert_eq!(results[1].url.as_deref(), Some("https://www.ibm.com/topics/quantum-computing"));
        assert!(results[1].snippet.is_empty());
    }

    #[test]
    fn skips_ads() {
        let results = parse_results(LISTING, 10);
        assert!(results.iter().all(|r| r.title != "Sponsored"));
    }

    #[test]
    fn respects_max_results() {
        let results = parse_results(LISTING, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "What is quantum computing? | IBM");
    }

    #[test]
    fn empty_or_foreign_html_yields_nothing() {
        assert!(parse_results("", 3).is_empty());
        assert!(parse_results("<html><body><p>captcha</p></body></html>", 3).is_empty());
    }

    #[test]
    fn resolves_redirect_links() {
        assert_eq!(
            resolve_href("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc&rut=x").as_deref(),
            Some("https://example.com/a?b=c")
        );
        assert_eq!(resolve_href("https://example.com").as_deref(), Some("https://example.com"));
        assert_eq!(resolve_href("/relative/path"), None);
        assert_eq!(resolve_href("//duckduckgo.com/l/?uddg=javascript%3Aalert(1)"), None);
    }

    #[test]
    fn clips_long_titles() {
        let long_title = "word ".repeat(60);
        let html = format!(
            r#"<div class="result"><h2 class="result__title"><a href="https://x.example">{long_title}</a></h2></div>"#
        );
        let results = parse_results(&html, 1);
        assert!(results[0].title.chars().count() <= MAX_TITLE_CHARS);
    }
}
