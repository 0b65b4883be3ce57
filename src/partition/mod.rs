//! Content partitioning
//!
//! Routes a fetched resource to the right extraction strategy based on URL
//! shape and declared content type, then normalizes the output into an
//! ordered sequence of typed content elements.
//!
//! Parsers are tried in a fixed priority order and the first that claims
//! the resource wins. The order is explicit construction-time data, not an
//! artifact of registration:
//!
//! 1. legal-source HTML (eur-lex act text)
//! 2. primary-site HTML (publication pages)
//! 3. PDF
//! 4. generic HTML fallback
//!
//! An unclaimed resource partitions to an empty sequence with a warning.
//! Only a parser that actually fails while extracting returns an error;
//! "nothing extracted" and "extraction failed" are distinct outcomes.

mod grouping;
mod html;
mod pdf;

pub use grouping::{group_by_title, GroupingPolicy, Section};
pub use html::{GenericHtmlParser, LegalSourceHtmlParser, PrimarySiteHtmlParser};
pub use pdf::PdfParser;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Errors raised while extracting content from one document
#[derive(Debug, Error)]
pub enum PartitionError {
    /// A CSS selector failed to compile
    #[error("invalid selector '{0}'")]
    Selector(String),

    /// The PDF extractor rejected the document
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
}

/// Structural role of one extracted element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Title,
    NarrativeText,
    ListItem,
    Table,
    Image,
    PageBreak,
    /// A grouped run of elements produced by title grouping
    Composite,
}

/// One unit of extracted content in document reading order
#[derive(Debug, Clone)]
pub struct ContentElement {
    pub text: String,
    pub kind: ElementKind,

    /// Source page for paginated formats, absent for HTML
    pub page_number: Option<u32>,

    /// Position in the partitioned output, assigned by the pipeline
    pub index: usize,
}

impl ContentElement {
    pub fn new(kind: ElementKind, text: String, page_number: Option<u32>) -> Self {
        Self {
            text,
            kind,
            page_number,
            index: 0,
        }
    }
}

/// One extraction strategy
pub trait DocumentParser: Send + Sync {
    /// Strategy name used in logs
    fn name(&self) -> &'static str;

    /// Whether this parser claims the resource
    fn can_process(&self, url: &str, content_type: Option<&str>) -> bool;

    /// Extracts raw elements from the resource body
    fn parse(&self, body: &[u8], url: &str) -> Result<Vec<ContentElement>, PartitionError>;
}

/// Ordered parser dispatch plus the shared partition-time grouping policy
pub struct ParserPipeline {
    parsers: Vec<Box<dyn DocumentParser>>,
    grouping: GroupingPolicy,
}

impl ParserPipeline {
    pub fn new(parsers: Vec<Box<dyn DocumentParser>>, grouping: GroupingPolicy) -> Self {
        Self { parsers, grouping }
    }

    /// Builds the standard parser order from configuration
    pub fn from_config(config: &Config) -> Self {
        let parsers: Vec<Box<dyn DocumentParser>> = vec![
            Box::new(LegalSourceHtmlParser::eurlex()),
            Box::new(PrimarySiteHtmlParser::new(
                config.rules.primary_domains.clone(),
            )),
            Box::new(PdfParser),
            Box::new(GenericHtmlParser),
        ];
        Self::new(parsers, GroupingPolicy::from(&config.partitioner))
    }

    /// Name of the parser that would claim this resource, if any
    pub fn selected_parser(&self, url: &str, content_type: Option<&str>) -> Option<&'static str> {
        self.parsers
            .iter()
            .find(|p| p.can_process(url, content_type))
            .map(|p| p.name())
    }

    /// Partitions one fetched resource into grouped content elements
    ///
    /// All parser variants share the same element-level size policy: raw
    /// elements are grouped by title into composite sections so that lone
    /// headings and one-line fragments never reach the index as standalone
    /// records.
    ///
    /// # Returns
    ///
    /// * `Ok(elements)` - Grouped elements; empty when no parser claimed
    ///   the resource or its content region was absent
    /// * `Err(PartitionError)` - The claiming parser failed while extracting
    pub fn process(
        &self,
        body: &[u8],
        url: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<ContentElement>, PartitionError> {
        for parser in &self.parsers {
            if parser.can_process(url, content_type) {
                debug!(url, parser = parser.name(), "partitioning");
                let raw = parser.parse(body, url)?;
                return Ok(self.finish(raw));
            }
        }

        warn!(url, ?content_type, "no parser available");
        Ok(Vec::new())
    }

    /// Applies partition-time grouping and assigns final element indices
    fn finish(&self, raw: Vec<ContentElement>) -> Vec<ContentElement> {
        group_by_title(&raw, &self.grouping)
            .into_iter()
            .enumerate()
            .map(|(index, section)| ContentElement {
                text: section.text,
                kind: ElementKind::Composite,
                page_number: section.page_number,
                index,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> ParserPipeline {
        ParserPipeline::new(
            vec![
                Box::new(LegalSourceHtmlParser::eurlex()),
                Box::new(PrimarySiteHtmlParser::new(vec!["cssf.lu".to_string()])),
                Box::new(PdfParser),
                Box::new(GenericHtmlParser),
            ],
            GroupingPolicy {
                max_chars: 1500,
                new_after_chars: 1200,
                combine_under_chars: 300,
            },
        )
    }

    #[test]
    fn test_pdf_selected_ahead_of_html_parsers() {
        let p = pipeline();
        assert_eq!(
            p.selected_parser(
                "https://www.cssf.lu/wp-content/uploads/cssf22_810.pdf",
                Some("application/pdf"),
            ),
            Some("pdf")
        );
    }

    #[test]
    fn test_parser_priority_order() {
        let p = pipeline();

        assert_eq!(
            p.selected_parser(
                "https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=x",
                Some("text/html"),
            ),
            Some("legal_source_html")
        );
        assert_eq!(
            p.selected_parser("https://www.cssf.lu/en/page", Some("text/html")),
            Some("primary_site_html")
        );
        assert_eq!(
            p.selected_parser("https://data.legilux.public.lu/eli/etat", Some("text/html")),
            Some("generic_html")
        );
    }

    #[test]
    fn test_unclaimed_resource_partitions_to_empty() {
        let p = pipeline();
        assert_eq!(p.selected_parser("https://www.cssf.lu/logo.png", Some("image/png")), None);

        let elements = p
            .process(b"\x89PNG", "https://www.cssf.lu/logo.png", Some("image/png"))
            .unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn test_process_groups_into_indexed_composites() {
        let p = pipeline();
        let body = format!(
            r#"<div class="content-section">
                <h2>Heading one</h2><p>{}</p>
                <h2>Heading two</h2><p>{}</p>
            </div>"#,
            "a".repeat(600),
            "b".repeat(600),
        );

        let elements = p
            .process(body.as_bytes(), "https://www.cssf.lu/en/page", Some("text/html"))
            .unwrap();

        assert_eq!(elements.len(), 2);
        assert!(elements.iter().all(|e| e.kind == ElementKind::Composite));
        let indices: Vec<usize> = elements.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(elements[0].text.starts_with("Heading one"));
    }

    #[test]
    fn test_missing_region_is_ok_not_error() {
        let p = pipeline();
        let elements = p
            .process(
                b"<html><body><p>boilerplate</p></body></html>",
                "https://www.cssf.lu/en/page",
                Some("text/html"),
            )
            .unwrap();
        assert!(elements.is_empty());
    }
}
