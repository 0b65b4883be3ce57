//! Structural chunking
//!
//! Converts a partitioned element sequence into final-sized chunks ready
//! for embedding. Elements are first grouped along title boundaries; a
//! section that still exceeds the hard maximum (a long run of text with no
//! internal headings) is re-split by the fallback splitter with overlap
//! between the resulting subsections.

mod splitter;

pub use splitter::RecursiveSplitter;

use crate::config::ChunkerConfig;
use crate::partition::{group_by_title, ContentElement, GroupingPolicy};

/// How a chunk was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// A whole title-grouped section within the size budget
    TitleSection,

    /// One subsection of a section the fallback splitter had to cut
    TitleSubsection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::TitleSection => "title_section",
            ChunkKind::TitleSubsection => "title_subsection",
        }
    }
}

/// The unit of embedding and storage
///
/// Text is trimmed and non-empty, and never longer than the configured
/// maximum. Chunk index increases in reading order within one source
/// document.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub source_url: String,
    pub kind: ChunkKind,

    /// True when the fallback splitter produced this chunk
    pub is_split_chunk: bool,

    /// Zero-based position among the subsections of one split section
    pub subsection_index: Option<usize>,

    /// Position within the source document's chunk sequence
    pub index: usize,

    /// Page of the first contributing element, for paginated sources
    pub page_number: Option<u32>,
}

/// Title-aware chunker with a recursive fallback for oversized sections
#[derive(Debug, Clone)]
pub struct Chunker {
    grouping: GroupingPolicy,
    splitter: RecursiveSplitter,
    max_chars: usize,
}

impl Chunker {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            grouping: GroupingPolicy {
                max_chars: config.max_chars,
                new_after_chars: config.new_after_chars(),
                combine_under_chars: config.combine_under_chars,
            },
            splitter: RecursiveSplitter::new(config.max_chars, config.overlap_chars),
            max_chars: config.max_chars,
        }
    }

    /// Chunks one document's element sequence
    ///
    /// Chunk order follows element reading order. Whitespace-only output
    /// is discarded, so a page of empty markup yields no chunks.
    pub fn chunk(&self, elements: &[ContentElement], source_url: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();

        for section in group_by_title(elements, &self.grouping) {
            let text = section.text.trim();
            if text.is_empty() {
                continue;
            }

            if text.len() > self.max_chars {
                let pieces = self.splitter.split(text);
                for (subsection_index, piece) in pieces
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .enumerate()
                {
                    chunks.push(Chunk {
                        text: piece.to_string(),
                        source_url: source_url.to_string(),
                        kind: ChunkKind::TitleSubsection,
                        is_split_chunk: true,
                        subsection_index: Some(subsection_index),
                        index: chunks.len(),
                        page_number: section.page_number,
                    });
                }
            } else {
                chunks.push(Chunk {
                    text: text.to_string(),
                    source_url: source_url.to_string(),
                    kind: ChunkKind::TitleSection,
                    is_split_chunk: false,
                    subsection_index: None,
                    index: chunks.len(),
                    page_number: section.page_number,
                });
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::ElementKind;

    const SOURCE: &str = "https://www.cssf.lu/en/2022/07/circular-cssf-22-810/";

    fn chunker() -> Chunker {
        Chunker::new(&ChunkerConfig::default())
    }

    fn composite(text: String) -> ContentElement {
        ContentElement::new(ElementKind::Composite, text, None)
    }

    fn sentence_text(chars: usize) -> String {
        let sentence = "The institution shall notify the competent authority without delay. ";
        sentence.repeat(chars / sentence.len() + 1)[..chars].to_string()
    }

    #[test]
    fn test_sized_section_becomes_title_section_chunk() {
        let elements = vec![composite(sentence_text(900))];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::TitleSection);
        assert_eq!(chunks[0].kind.as_str(), "title_section");
        assert!(!chunks[0].is_split_chunk);
        assert_eq!(chunks[0].subsection_index, None);
        assert_eq!(chunks[0].source_url, SOURCE);
    }

    #[test]
    fn test_oversized_section_split_into_subsections() {
        // A 2600-char single section with no internal headings must come
        // back as two or more bounded subsections
        let elements = vec![composite(sentence_text(2600))];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.text.len() <= 1800);
            assert_eq!(chunk.kind, ChunkKind::TitleSubsection);
            assert_eq!(chunk.kind.as_str(), "title_subsection");
            assert!(chunk.is_split_chunk);
            assert_eq!(chunk.subsection_index, Some(i));
        }
    }

    #[test]
    fn test_chunk_indices_increase_across_sections() {
        let elements = vec![
            composite(sentence_text(900)),
            composite(sentence_text(2600)),
            composite(sentence_text(900)),
        ];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert!(chunks.len() >= 4);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        let expected: Vec<usize> = (0..chunks.len()).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn test_all_chunks_within_budget() {
        let elements = vec![
            composite(sentence_text(5200)),
            composite(sentence_text(1799)),
            composite(sentence_text(3100)),
        ];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert!(chunks.iter().all(|c| c.text.len() <= 1800));
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
    }

    #[test]
    fn test_whitespace_elements_yield_no_chunks() {
        let elements = vec![
            composite("   ".to_string()),
            composite("\n\n\n".to_string()),
        ];
        let chunks = chunker().chunk(&elements, SOURCE);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunker().chunk(&[], SOURCE).is_empty());
    }

    #[test]
    fn test_page_number_propagated_to_chunks() {
        let elements = vec![ContentElement::new(
            ElementKind::Composite,
            sentence_text(700),
            Some(4),
        )];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_number, Some(4));
    }

    #[test]
    fn test_small_raw_elements_grouped_before_chunking() {
        // Ungrouped raw elements still pass through title grouping here
        let elements = vec![
            ContentElement::new(ElementKind::Title, "Scope".to_string(), None),
            ContentElement::new(ElementKind::NarrativeText, sentence_text(150), None),
        ];
        let chunks = chunker().chunk(&elements, SOURCE);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("Scope"));
    }
}
