use crate::fetch::extractor::ExtractedContent;
use crate::sources::{SearchResult, SourceKind, SourceSelector};
use crate::text::{clip_chars, normalize_whitespace, truncate_with_suffix};

const SEPARATOR: &str = "========================================";
const MAX_QUERY_ECHO_CHARS: usize = 200;
/// Below this much free space a shortened first section is not worth emitting.
const MIN_PARTIAL_SECTION: usize = 160;
const PARTIAL_SUFFIX: &str = "...\n[Content truncated due to size limits]\n\n";

/// A search result paired with whatever its page yielded.
#[derive(Debug, Clone)]
pub(crate) struct Finding {
    pub result: SearchResult,
    pub content: ExtractedContent,
}

/// Assemble the research document within `max_size` bytes.
///
/// Sections are emitted in `findings` order and never split, except that a
/// first section too large for the whole budget is shortened rather than
/// dropped. The summary footer always fits.
pub(crate) fn render(
    query: &str,
    selector: SourceSelector,
    findings: &[Finding],
    unavailable: &[SourceKind],
    max_size: usize,
) -> String {
    let query = clip_chars(&normalize_whitespace(query), MAX_QUERY_ECHO_CHARS);
    let mut doc = format!(
        "Research Query: {query}\n\nSearching {}...\n\n",
        selector.describe()
    );

    for kind in unavailable {
        doc.push_str(&format!(
            "Note: {kind} search returned no usable results (source unavailable).\n"
        ));
    }
    if !unavailable.is_empty() {
        doc.push('\n');
    }

    if findings.is_empty() {
        doc.push_str("No valid search results found. Please try a different query.\n");
        return enforce_limit(doc, max_size);
    }

    let total = findings.len();
    doc.push_str(&format!("DETAILED CONTENT FROM TOP {total} SOURCES:\n\n"));

    let reserve = summary(&query, selector, total).len() + omission_notice(total).len();
    let budget = max_size.saturating_sub(reserve);

    let mut included = 0;
    for (i, finding) in findings.iter().enumerate() {
        let section = format_section(i + 1, finding);
        if doc.len() + section.len() <= budget {
            doc.push_str(&section);
            included += 1;
            continue;
        }
        let room = budget.saturating_sub(doc.len());
        if included == 0 && room >= MIN_PARTIAL_SECTION {
            doc.push_str(&truncate_with_suffix(&section, room, PARTIAL_SUFFIX));
            included = 1;
        }
        break;
    }

    if included < total {
        doc.push_str(&omission_notice(total - included));
    }
    doc.push_str(&summary(&query, selector, included));
    enforce_limit(doc, max_size)
}

fn format_section(index: usize, finding: &Finding) -> String {
    let result = &finding.result;
    let content = &finding.content;

    let title = if !result.title.is_empty() {
        result.title.clone()
    } else {
        content
            .title
            .clone()
            .unwrap_or_else(|| format!("Source {index}"))
    };

    let mut section = format!(
        "{SEPARATOR}\nSOURCE {index} ({}): {}\n{SEPARATOR}\n",
        result.kind,
        normalize_whitespace(&title)
    );
    if let Some(url) = &result.url {
        section.push_str(&format!("URL: {url}\n"));
    }
    if let Some(citation) = result.paper.as_ref().and_then(|p| p.citation()) {
        section.push_str(&format!("Citation: {citation}\n"));
    }
    section.push('\n');

    if content.success {
        section.push_str("Content:\n");
        section.push_str(&content.text);
    } else if let Some(description) = &content.description {
        section.push_str("Description (full text unavailable):\n");
        section.push_str(description);
    } else if !result.snippet.is_empty() {
        let label = match result.kind {
            SourceKind::Academic => "Abstract",
            SourceKind::Web => "Snippet",
        };
        section.push_str(&format!("{label} (full text unavailable):\n"));
        section.push_str(&result.snippet);
    } else {
        section.push_str("(no content available)");
    }
    section.push_str("\n\n");
    section
}

fn omission_notice(omitted: usize) -> String {
    format!("[{omitted} further source(s) omitted due to size limits]\n\n")
}

fn summary(query: &str, selector: SourceSelector, examined: usize) -> String {
    format!(
        "RESEARCH SUMMARY:\nCompleted research on: {query}\nExamined {examined} sources from {}\nThe information above represents the most relevant content found on this topic.\n",
        selector.describe()
    )
}

fn enforce_limit(doc: String, max_size: usize) -> String {
    if doc.len() <= max_size {
        doc
    } else {
        truncate_with_suffix(&doc, max_size, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PaperMeta;

    fn web(title: &str, url: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: Some(url.into()),
            snippet: snippet.into(),
            kind: SourceKind::Web,
            paper: None,
        }
    }

    fn extracted(text: &str) -> ExtractedContent {
        ExtractedContent {
            text: text.into(),
            success: true,
            ..ExtractedContent::default()
        }
    }

    fn finding(result: SearchResult, content: ExtractedContent) -> Finding {
        Finding { result, content }
    }

    #[test]
    fn renders_sections_in_order_with_summary() {
        let findings = vec![
            finding(web("First", "https://a.example", "snip a"), extracted("alpha body")),
            finding(web("Second", "https://b.example", "snip b"), extracted("beta body")),
        ];

        let doc = render("test query", SourceSelector::Web, &findings, &[], 8000);

        assert!(doc.starts_with("Research Query: test query\n\nSearching web sources..."));
        assert!(doc.contains("DETAILED CONTENT FROM TOP 2 SOURCES"));
        let first = doc.find("SOURCE 1 (web): First").unwrap();
        let second = doc.find("SOURCE 2 (web): Second").unwrap();
        assert!(first < second);
        assert!(doc.contains("URL: https://a.example"));
        assert!(doc.contains("Content:\nalpha body"));
        assert!(doc.contains("Examined 2 sources from web sources"));
        assert!(!doc.contains("omitted"));
    }

    #[test]
    fn failed_extraction_falls_back_to_snippet() {
        let findings = vec![finding(
            web("Blocked", "https://blocked.example", "the snippet text"),
            ExtractedContent::failed(),
        )];

        let doc = render("q", SourceSelector::Web, &findings, &[], 8000);
        assert!(doc.contains("SOURCE 1 (web): Blocked"));
        assert!(doc.contains("Snippet (full text unavailable):\nthe snippet text"));
    }

    #[test]
    fn meta_description_precedes_snippet_fallback() {
        let content = ExtractedContent {
            description: Some("From the page's meta tag.".into()),
            ..ExtractedContent::failed()
        };
        let findings = vec![finding(web("Sparse", "https://sparse.example", "search snippet"), content)];

        let doc = render("q", SourceSelector::Web, &findings, &[], 8000);
        assert!(doc.contains("Description (full text unavailable):\nFrom the page's meta tag."));
        assert!(!doc.contains("search snippet"));
    }

    #[test]
    fn academic_section_has_citation_and_abstract_label() {
        let result = SearchResult {
            title: "A Paper".into(),
            url: None,
            snippet: "We study things.".into(),
            kind: SourceKind::Academic,
            paper: Some(PaperMeta {
                authors: vec!["A. Author".into()],
                more_authors: false,
                year: Some(2020),
                venue: Some("Science".into()),
            }),
        };
        let doc = render(
            "q",
            SourceSelector::Academic,
            &[finding(result, ExtractedContent::failed())],
            &[],
            8000,
        );
        assert!(doc.contains("SOURCE 1 (academic): A Paper"));
        assert!(doc.contains("Citation: A. Author (2020) - Science"));
        assert!(!doc.contains("URL:"));
        assert!(doc.contains("Abstract (full text unavailable):\nWe study things."));
    }

    #[test]
    fn empty_findings_produce_no_results_note() {
        let doc = render(
            "nothing",
            SourceSelector::Both,
            &[],
            &[SourceKind::Web, SourceKind::Academic],
            8000,
        );
        assert!(doc.contains("Note: web search returned no usable results"));
        assert!(doc.contains("Note: academic search returned no usable results"));
        assert!(doc.contains("No valid search results found"));
    }

    #[test]
    fn stops_at_section_boundary_when_over_budget() {
        let body = "word ".repeat(150);
        let findings: Vec<_> = (1..=4)
            .map(|i| {
                finding(
                    web(&format!("Result {i}"), &format!("https://{i}.example"), ""),
                    extracted(body.trim()),
                )
            })
            .collect();

        let doc = render("q", SourceSelector::Web, &findings, &[], 2000);

        assert!(doc.len() <= 2000, "len {}", doc.len());
        assert!(doc.contains("SOURCE 1 (web)"));
        assert!(!doc.contains("SOURCE 4 (web)"));
        assert!(doc.contains("further source(s) omitted due to size limits"));
        assert!(doc.ends_with("found on this topic.\n"));
        assert!(!doc.contains("[Content truncated"), "sections must not be split");
    }

    #[test]
    fn oversized_first_section_is_shortened_not_dropped() {
        let body = "lorem ipsum ".repeat(500);
        let findings = vec![finding(web("Huge", "https://huge.example", ""), extracted(&body))];

        let doc = render("q", SourceSelector::Web, &findings, &[], 1200);

        assert!(doc.len() <= 1200, "len {}", doc.len());
        assert!(doc.contains("SOURCE 1 (web): Huge"));
        assert!(doc.contains("[Content truncated due to size limits]"));
        assert!(doc.contains("Examined 1 sources"));
    }

    #[test]
    fn tiny_budget_is_still_respected() {
        let findings = vec![finding(web("T", "https://t.example", "s"), extracted("body"))];
        let doc = render(&"long query ".repeat(50), SourceSelector::Both, &findings, &[], 64);
        assert!(doc.len() <= 64, "len {}", doc.len());
    }

    #[test]
    fn untitled_result_uses_page_title() {
        let content = ExtractedContent {
            title: Some("Page Title".into()),
            text: "text".into(),
            success: true,
            ..ExtractedContent::default()
        };
        let doc = render(
            "q",
            SourceSelector::Web,
            &[finding(web("", "https://x.example", ""), content)],
            &[],
            8000,
        );
        assert!(doc.contains("SOURCE 1 (web): Page Title"));
    }
}
