//! PDF extraction
//!
//! Regulatory PDFs (circulars, annual reports, laws) are extracted with
//! positional text extraction, split into per-page blocks on the form-feed
//! markers the extractor emits between pages. Short unpunctuated lines are
//! treated as headings so that title grouping can keep articles and
//! chapters together.

use tracing::debug;

use super::{ContentElement, DocumentParser, ElementKind, PartitionError};

/// Form feed separates pages in extracted PDF text
const PAGE_SEPARATOR: char = '\u{000C}';

/// A line this long or shorter with no closing punctuation reads as a heading
const MAX_HEADING_CHARS: usize = 100;

pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn name(&self) -> &'static str {
        "pdf"
    }

    /// PDF is claimed by URL extension or declared content type, either
    /// alone suffices. Servers frequently mislabel one of the two.
    fn can_process(&self, url: &str, content_type: Option<&str>) -> bool {
        url.to_ascii_lowercase().ends_with(".pdf")
            || content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
    }

    fn parse(&self, body: &[u8], url: &str) -> Result<Vec<ContentElement>, PartitionError> {
        let text = pdf_extract::extract_text_from_mem(body)
            .map_err(|e| PartitionError::Pdf(e.to_string()))?;

        let elements = elements_from_text(&text);
        debug!(url, elements = elements.len(), "extracted pdf text");
        Ok(elements)
    }
}

/// Shapes raw extracted text into typed per-page elements
///
/// Pages split on form feed; blocks split on blank lines within a page.
/// Line breaks inside a block are layout artifacts and are collapsed.
fn elements_from_text(text: &str) -> Vec<ContentElement> {
    let mut elements = Vec::new();

    for (page_index, page) in text.split(PAGE_SEPARATOR).enumerate() {
        let page_number = Some(page_index as u32 + 1);
        if page_index > 0 {
            elements.push(ContentElement::new(
                ElementKind::PageBreak,
                String::new(),
                page_number,
            ));
        }

        for block in page.split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            let kind = if looks_like_heading(block) {
                ElementKind::Title
            } else {
                ElementKind::NarrativeText
            };
            let flattened = block.split_whitespace().collect::<Vec<_>>().join(" ");
            elements.push(ContentElement::new(kind, flattened, page_number));
        }
    }

    elements
}

/// Heading heuristic for extracted text
///
/// A heading is a single short line that does not end in sentence
/// punctuation and contains at least one letter.
fn looks_like_heading(block: &str) -> bool {
    if block.contains('\n') || block.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    let trimmed = block.trim_end();
    if trimmed.ends_with(['.', ',', ';', ':']) {
        return false;
    }
    trimmed.chars().any(|c| c.is_alphabetic())
}
