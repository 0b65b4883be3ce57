//! Document metadata extraction for primary-site publication pages
//!
//! Publication pages carry a structured header (title, subtitle, category,
//! dates) and sidebar lists (themes, entities, keywords) plus two
//! related-content sections. Every field falls back to a default when its
//! markup is absent, so extraction is total: a sparse page yields a sparse
//! record, never an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// One publication page's metadata record
///
/// Archived as `metadata.json` next to the page's referenced documents and
/// flattened into chunk metadata at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub document_type: String,
    pub document_number: String,
    pub publication_date: Option<String>,
    pub update_date: Option<String>,
    pub top_related: Vec<String>,
    pub bottom_related: Vec<String>,
    pub themes: Vec<String>,
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
    pub lang: String,
    pub super_category: String,
    pub content_hash: String,
    pub crawl_timestamp: DateTime<Utc>,
    pub file_size: usize,
}

struct PageSelectors {
    title: Selector,
    subtitle: Selector,
    category: Selector,
    date: Selector,
    updated_date: Selector,
    top_related: Selector,
    bottom_related: Selector,
    themes: Selector,
    entities: Selector,
    keywords: Selector,
}

static SELECTORS: LazyLock<PageSelectors> = LazyLock::new(|| PageSelectors {
    title: sel("h1.single-news__title"),
    subtitle: sel(".single-news__subtitle p"),
    category: sel(".main-category"),
    date: sel(".single-news__date"),
    updated_date: sel(".single-news__date--updated"),
    top_related: sel(".related-elements-container a[href]"),
    bottom_related: sel(r#".related-documents-container a[href*="/Document/"]"#),
    themes: sel(".themes-list a"),
    entities: sel(".entities-list a"),
    keywords: sel(".keywords a"),
});

fn sel(source: &str) -> Selector {
    Selector::parse(source).unwrap()
}

static NUMBER_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cssf-(\d{2}-\d{3})").unwrap());
static NUMBER_IN_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CSSF\s+(\d{2}/\d{3})").unwrap());
static PUBLISHED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Published on|Publié le|Veröffentlicht am)\s+").unwrap()
});
static UPDATED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Updated on|Mis à jour le|Aktualisiert am)\s+").unwrap()
});
static DATE_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2}\s+\w+\s+\d{4})").unwrap());

/// Extracts the metadata record from one publication page
pub fn extract(body: &[u8], url: &str) -> DocumentMetadata {
    let html = Html::parse_document(&String::from_utf8_lossy(body));
    let selectors = &*SELECTORS;

    let title = first_text(&html, &selectors.title).unwrap_or_else(|| "Unknown Document".to_string());
    let subtitle = first_text(&html, &selectors.subtitle).unwrap_or_default();
    let document_type =
        first_text(&html, &selectors.category).unwrap_or_else(|| "Unknown Document Type".to_string());

    DocumentMetadata {
        url: url.to_string(),
        document_number: extract_document_number(url, &title),
        title,
        subtitle,
        document_type,
        publication_date: extract_date(&html, &selectors.date, &PUBLISHED_PREFIX),
        update_date: extract_date(&html, &selectors.updated_date, &UPDATED_PREFIX),
        top_related: extract_links(&html, &selectors.top_related, url),
        bottom_related: extract_links(&html, &selectors.bottom_related, url),
        themes: all_texts(&html, &selectors.themes),
        entities: all_texts(&html, &selectors.entities),
        keywords: all_texts(&html, &selectors.keywords),
        lang: extract_lang(url),
        super_category: super_category(url).to_string(),
        content_hash: hex::encode(Sha256::digest(body)),
        crawl_timestamp: Utc::now(),
        file_size: body.len(),
    }
}

/// Page classification by URL shape
///
/// Dedicated document pages live under `/Document/`; everything else on
/// the primary site is a post.
pub fn super_category(url: &str) -> &'static str {
    if url.contains("/Document/") {
        "document"
    } else {
        "post"
    }
}

/// Document number from the URL slug, falling back to the title
///
/// URL slugs carry the dashed form (`cssf-22-810`), titles the slashed
/// form (`CSSF 22/810`).
fn extract_document_number(url: &str, title: &str) -> String {
    if let Some(captures) = NUMBER_IN_URL.captures(url) {
        return format!("CSSF {}", &captures[1]);
    }
    if let Some(captures) = NUMBER_IN_TITLE.captures(title) {
        return format!("CSSF {}", &captures[1]);
    }
    "Unknown".to_string()
}

/// Language segment of the URL path, `unknown` when absent
fn extract_lang(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Strips the localized prefix and pulls out a `12 July 2022` style date
fn extract_date(html: &Html, selector: &Selector, prefix: &Regex) -> Option<String> {
    let raw = first_text(html, selector)?;
    let stripped = prefix.replace(&raw, "");
    DATE_VALUE
        .captures(&stripped)
        .map(|captures| captures[1].to_string())
}

/// Collects, absolutizes, and order-preservingly deduplicates hrefs
fn extract_links(html: &Html, selector: &Selector, base: &str) -> Vec<String> {
    let base_url = Url::parse(base).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in html.select(selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        let absolute = match Url::parse(href) {
            Ok(url) => url.to_string(),
            Err(_) => match base_url.as_ref().and_then(|b| b.join(href).ok()) {
                Some(url) => url.to_string(),
                None => continue,
            },
        };

        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

fn first_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn all_texts(html: &Html, selector: &Selector) -> Vec<String> {
    html.select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
