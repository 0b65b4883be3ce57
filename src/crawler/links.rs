//! Link extraction from HTML pages
//!
//! Pulls anchor targets out of a fetched page and resolves them against
//! the page URL. Non-navigational anchors (downloads, pseudo-schemes,
//! same-page fragments) are dropped here so the coordinator only ever
//! sees candidate page URLs.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Extracts followable links from an HTML document
///
/// Returns absolute http(s) URLs in document order, deduplicated.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let mut seen: HashSet<String> = HashSet::new();
    let mut links: Vec<String> = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            // Anchors marked as downloads point at files, not pages
            if element.value().attr("download").is_some() {
                continue;
            }
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(resolved) = resolve_link(href, base_url) {
                if seen.insert(resolved.clone()) {
                    links.push(resolved);
                }
            }
        }
    }

    links
}

/// Resolves a single href against the page URL
///
/// Returns `None` for empty hrefs, same-page fragments, pseudo-schemes,
/// and anything that does not resolve to an http(s) URL.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if lowered.starts_with(scheme) {
            return None;
        }
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.cssf.lu/en/publications/").unwrap()
    }

    #[test]
    fn test_relative_links_resolved_against_page() {
        let html = r#"<a href="circular-24-860/">Circular</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(
            links,
            vec!["https://www.cssf.lu/en/publications/circular-24-860/"]
        );
    }

    #[test]
    fn test_root_relative_links_resolved_against_host() {
        let html = r#"<a href="/en/warnings/">Warnings</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links, vec!["https://www.cssf.lu/en/warnings/"]);
    }

    #[test]
    fn test_absolute_links_kept() {
        let html = r#"<a href="https://www.cnpd.lu/en/">CNPD</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links, vec!["https://www.cnpd.lu/en/"]);
    }

    #[test]
    fn test_pseudo_schemes_skipped() {
        let html = r#"
            <a href="javascript:void(0)">JS</a>
            <a href="MAILTO:info@cssf.lu">Mail</a>
            <a href="tel:+352123456">Call</a>
            <a href="data:text/plain,hi">Data</a>
        "#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_fragment_only_links_skipped() {
        let html = r##"<a href="#section-2">Jump</a>"##;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_download_anchors_skipped() {
        let html = r#"<a href="/documents/report.pdf" download>Report</a>"#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_non_http_schemes_skipped() {
        let html = r#"<a href="ftp://files.cssf.lu/archive/">FTP</a>"#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_duplicates_collapsed_in_order() {
        let html = r#"
            <a href="/en/a/">A</a>
            <a href="/en/b/">B</a>
            <a href="/en/a/">A again</a>
        "#;
        let links = extract_links(html, &base());
        assert_eq!(
            links,
            vec![
                "https://www.cssf.lu/en/a/",
                "https://www.cssf.lu/en/b/"
            ]
        );
    }

    #[test]
    fn test_nofollow_links_still_extracted() {
        let html = r#"<a href="/en/external/" rel="nofollow">Out</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links, vec!["https://www.cssf.lu/en/external/"]);
    }

    #[test]
    fn test_anchor_without_href_ignored() {
        let html = r#"<a name="top">Top</a><a href="/en/real/">Real</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links, vec!["https://www.cssf.lu/en/real/"]);
    }
}
