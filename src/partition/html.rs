//! HTML extraction strategies
//!
//! Three parser variants share one block-level extraction routine:
//!
//! - [`LegalSourceHtmlParser`] reads only the legal-text container of a
//!   cross-referenced legislation site (eur-lex uses `div.PP4Contents`)
//! - [`PrimarySiteHtmlParser`] reads only `div.content-section` regions of
//!   primary-domain pages, dropping navigation and page chrome
//! - [`GenericHtmlParser`] is the whole-page fallback for any other HTML
//!
//! The specialized variants return an empty sequence when their container
//! is absent. Falling back to whole-page extraction there would index
//! menus and footers, which is worse than indexing nothing.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{ContentElement, DocumentParser, ElementKind, PartitionError};
use crate::rules::{extract_host, host_in_domain};

/// Block-level tags extracted as content elements, in document order
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, table, blockquote, pre, img[alt]";

/// Ancestor tags whose content is never extracted
const CHROME_TAGS: [&str; 6] = ["nav", "header", "footer", "aside", "script", "style"];

/// Compiled selectors for one extraction pass
struct BlockSelectors {
    blocks: Selector,
    rows: Selector,
    cells: Selector,
}

impl BlockSelectors {
    fn new() -> Result<Self, PartitionError> {
        Ok(Self {
            blocks: compile_selector(BLOCK_SELECTOR)?,
            rows: compile_selector("tr")?,
            cells: compile_selector("th, td")?,
        })
    }
}

fn compile_selector(source: &str) -> Result<Selector, PartitionError> {
    Selector::parse(source).map_err(|_| PartitionError::Selector(source.to_string()))
}

/// Specialized parser for a cross-referenced legislation site
///
/// Bound to one domain and the container selector that holds the legal
/// text on that site's pages.
pub struct LegalSourceHtmlParser {
    domain: String,
    container: String,
}

impl LegalSourceHtmlParser {
    pub fn new(domain: &str, container: &str) -> Self {
        Self {
            domain: domain.to_string(),
            container: container.to_string(),
        }
    }

    /// The eur-lex publication view keeps the act text in `div.PP4Contents`
    pub fn eurlex() -> Self {
        Self::new("eur-lex.europa.eu", "div.PP4Contents")
    }
}

impl DocumentParser for LegalSourceHtmlParser {
    fn name(&self) -> &'static str {
        "legal_source_html"
    }

    fn can_process(&self, url: &str, content_type: Option<&str>) -> bool {
        is_html(content_type) && !has_pdf_extension(url) && url_on_domain(url, &self.domain)
    }

    fn parse(&self, body: &[u8], url: &str) -> Result<Vec<ContentElement>, PartitionError> {
        extract_from_container(body, url, &self.container)
    }
}

/// Specialized parser for primary-domain pages
///
/// Publication pages on the primary site wrap their article body in
/// `div.content-section` blocks; everything outside them is boilerplate.
pub struct PrimarySiteHtmlParser {
    domains: Vec<String>,
    container: String,
}

impl PrimarySiteHtmlParser {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains,
            container: "div.content-section".to_string(),
        }
    }
}

impl DocumentParser for PrimarySiteHtmlParser {
    fn name(&self) -> &'static str {
        "primary_site_html"
    }

    fn can_process(&self, url: &str, content_type: Option<&str>) -> bool {
        is_html(content_type)
            && !has_pdf_extension(url)
            && self.domains.iter().any(|d| url_on_domain(url, d))
    }

    fn parse(&self, body: &[u8], url: &str) -> Result<Vec<ContentElement>, PartitionError> {
        extract_from_container(body, url, &self.container)
    }
}

/// Whole-page fallback for HTML that no specialized parser claims
pub struct GenericHtmlParser;

impl DocumentParser for GenericHtmlParser {
    fn name(&self) -> &'static str {
        "generic_html"
    }

    fn can_process(&self, _url: &str, content_type: Option<&str>) -> bool {
        is_html(content_type)
    }

    fn parse(&self, body: &[u8], _url: &str) -> Result<Vec<ContentElement>, PartitionError> {
        let document = Html::parse_document(&String::from_utf8_lossy(body));
        let selectors = BlockSelectors::new()?;
        Ok(collect_blocks(document.root_element(), &selectors))
    }
}

pub(super) fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

pub(super) fn has_pdf_extension(url: &str) -> bool {
    url.to_ascii_lowercase().ends_with(".pdf")
}

fn url_on_domain(url: &str, domain: &str) -> bool {
    extract_host(url).is_some_and(|host| host_in_domain(&host, domain))
}

/// Extracts block elements from all matches of a container selector
///
/// Returns an empty sequence when no container matches.
fn extract_from_container(
    body: &[u8],
    url: &str,
    container: &str,
) -> Result<Vec<ContentElement>, PartitionError> {
    let document = Html::parse_document(&String::from_utf8_lossy(body));
    let container_selector = compile_selector(container)?;
    let selectors = BlockSelectors::new()?;

    let mut elements = Vec::new();
    for region in document.select(&container_selector) {
        elements.extend(collect_blocks(region, &selectors));
    }

    if elements.is_empty() {
        debug!(url, container, "main content region absent or empty");
    }
    Ok(elements)
}

/// Walks block-level descendants of a scope in reading order
///
/// A block nested inside another matched block (a paragraph inside a list
/// item, a list inside a table cell) is skipped so its text is emitted
/// exactly once, as part of the outermost block.
fn collect_blocks(scope: ElementRef<'_>, selectors: &BlockSelectors) -> Vec<ContentElement> {
    let matches: Vec<ElementRef<'_>> = scope.select(&selectors.blocks).collect();
    let matched_ids: HashSet<_> = matches.iter().map(|m| m.id()).collect();

    let mut elements = Vec::new();
    'blocks: for block in matches {
        for ancestor in block.ancestors() {
            if matched_ids.contains(&ancestor.id()) {
                continue 'blocks;
            }
            if let Some(tag) = ancestor.value().as_element() {
                if CHROME_TAGS.contains(&tag.name()) {
                    continue 'blocks;
                }
            }
        }
        if let Some(element) = build_element(block, selectors) {
            elements.push(element);
        }
    }
    elements
}

fn build_element(block: ElementRef<'_>, selectors: &BlockSelectors) -> Option<ContentElement> {
    let (kind, text) = match block.value().name() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => (ElementKind::Title, collapsed_text(block)),
        "p" | "blockquote" => (ElementKind::NarrativeText, collapsed_text(block)),
        "pre" => (
            ElementKind::NarrativeText,
            block.text().collect::<String>().trim().to_string(),
        ),
        "li" => (ElementKind::ListItem, collapsed_text(block)),
        "table" => (ElementKind::Table, table_text(block, selectors)),
        "img" => (
            ElementKind::Image,
            collapse_whitespace(block.value().attr("alt").unwrap_or_default()),
        ),
        _ => return None,
    };

    if text.is_empty() {
        return None;
    }
    Some(ContentElement::new(kind, text, None))
}

/// Flattens a table into pipe-separated cells, one line per row
fn table_text(table: ElementRef<'_>, selectors: &BlockSelectors) -> String {
    let mut rows = Vec::new();
    for row in table.select(&selectors.rows) {
        let cells: Vec<String> = row
            .select(&selectors.cells)
            .map(collapsed_text)
            .filter(|cell| !cell.is_empty())
            .collect();
        if !cells.is_empty() {
            rows.push(cells.join(" | "));
        }
    }

    if rows.is_empty() {
        // Row-less markup still counts if text is present
        collapsed_text(table)
    } else {
        rows.join("\n")
    }
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
