use dom_smoothie::{Config, Readability};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

use crate::text::{clip_chars, normalize_whitespace};

/// Elements whose subtrees never carry readable body text.
const NOISE_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "aside",
    "form", "iframe", "button",
];

/// Elements that start a new line when rendered; their text must not run
/// into the neighbouring text. Inline elements are joined as-is.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "caption", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

/// Cleaned text derived from one fetched page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub title: Option<String>,
    /// `<meta name="description">`, used when the body yields nothing.
    pub description: Option<String>,
    pub text: String,
    pub success: bool,
}

impl ExtractedContent {
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Strip markup and boilerplate from `html`, returning at most `max_chars`
/// characters of whitespace-normalized text.
///
/// Pages that readability considers article-like are reduced to the article
/// first; everything else is walked whole. An empty result is reported as a
/// failed extraction so callers fall back to the description or snippet.
pub fn extract(url: &str, html: &str, max_chars: usize) -> ExtractedContent {
    let meta = page_meta(html);
    let description = meta.description.map(|d| clip_chars(&d, max_chars));
    let article = readable_article(html, url);
    let source = article.as_deref().unwrap_or(html);

    let text = clip_chars(&visible_text(source), max_chars);
    if text.is_empty() {
        debug!(url, has_description = description.is_some(), "no readable text extracted");
        return ExtractedContent {
            title: meta.title,
            description,
            ..ExtractedContent::failed()
        };
    }

    ExtractedContent {
        title: meta.title,
        description,
        text,
        success: true,
    }
}

fn readable_article(html: &str, url: &str) -> Option<String> {
    let mut readability = match Readability::new(html, Some(url), Some(Config::default())) {
        Ok(r) => r,
        Err(e) => {
            warn!(%e, "readability init failed, walking raw page");
            return None;
        }
    };

    if !readability.is_probably_readable() {
        return None;
    }

    match readability.parse() {
        Ok(article) if !article.content.is_empty() => Some(article.content.to_string()),
        Ok(_) => None,
        Err(e) => {
            warn!(%e, "readability parse failed, walking raw page");
            None
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct PageMeta {
    title: Option<String>,
    description: Option<String>,
}

fn page_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);
    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

    let title = Selector::parse("title").ok().and_then(|sel| {
        let el = document.select(&sel).next()?;
        non_empty(normalize_whitespace(&el.text().collect::<String>()))
    });
    let description = Selector::parse(r#"meta[name="description"]"#)
        .ok()
        .and_then(|sel| {
            let content = document.select(&sel).next()?.value().attr("content")?;
            non_empty(normalize_whitespace(content))
        });

    PageMeta { title, description }
}

/// Concatenate all text nodes outside noise elements, whitespace-normalized.
fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    normalize_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if NOISE_TAGS.contains(&el.name()) => {}
            Node::Element(el) => {
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
