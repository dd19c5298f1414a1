//! HTML parser for extracting page text and links
//!
//! This module turns a fetched HTML document into:
//! - Markdown-flavoured text (title, headings, paragraphs, list items, code)
//! - Links to follow, split into same-host and other-host sets

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Readable text of the page
    pub markdown: String,

    /// Links sharing the page's host (absolute URLs)
    pub internal_links: Vec<String>,

    /// Links to other hosts (absolute URLs)
    pub external_links: Vec<String>,
}

/// Block-level elements whose text becomes a markdown block
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote";

/// Parses HTML content and extracts text and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>` (handled as downloads, not pages)
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use wavecrawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.internal_links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let markdown = extract_markdown(&document, title.as_deref());

    let base_host = base_url.host_str().map(|h| h.to_lowercase());
    let (internal_links, external_links): (Vec<String>, Vec<String>) =
        extract_links(&document, base_url)
            .into_iter()
            .partition(|link| {
                Url::parse(link)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
                    == base_host
            });

    ParsedPage {
        title,
        markdown,
        internal_links,
        external_links,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Converts the document body into markdown-ish text
fn extract_markdown(document: &Html, title: Option<&str>) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(title) = title {
        blocks.push(format!("# {}", title));
    }

    let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else {
        return blocks.join("\n\n");
    };

    let before = blocks.len();
    for element in document.select(&selector) {
        // A <p> inside an <li> is emitted once, as part of the list item
        if has_block_ancestor(&element) {
            continue;
        }
        if let Some(block) = format_block(&element) {
            blocks.push(block);
        }
    }

    // Pages without block markup still have text worth keeping
    if blocks.len() == before {
        if let Ok(body) = Selector::parse("body") {
            if let Some(body) = document.select(&body).next() {
                let text = collapse_whitespace(&body.text().collect::<String>());
                if !text.is_empty() {
                    blocks.push(text);
                }
            }
        }
    }

    blocks.join("\n\n")
}

fn format_block(element: &ElementRef<'_>) -> Option<String> {
    let name = element.value().name();

    if name == "pre" {
        let code: String = element.text().collect();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return None;
        }
        return Some(format!("```\n{}\n```", code));
    }

    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        return None;
    }

    let block = match name {
        "h1" => format!("# {}", text),
        "h2" => format!("## {}", text),
        "h3" => format!("### {}", text),
        "h4" => format!("#### {}", text),
        "h5" => format!("##### {}", text),
        "h6" => format!("###### {}", text),
        "li" => format!("- {}", text),
        "blockquote" => format!("> {}", text),
        _ => text,
    };
    Some(block)
}

fn has_block_ancestor(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| matches!(ancestor.value().name(), "li" | "pre" | "blockquote"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
