//! Title-aware element grouping
//!
//! Shared by the partitioner (pre-grouping raw elements into composite
//! sections) and the chunker (building final chunk-sized sections). A Title
//! element always opens a new section; otherwise sections are closed by a
//! soft size threshold and small sections are merged with their successor.
//!
//! Grouping never splits element text. A single element longer than the
//! hard maximum becomes an oversized section; the chunker's fallback
//! splitter is responsible for cutting those down.

use super::{ContentElement, ElementKind};
use crate::config::PartitionerConfig;

/// Separator between element texts inside one section
const SECTION_SEPARATOR: &str = "\n\n";

/// Size thresholds for title grouping
#[derive(Debug, Clone, Copy)]
pub struct GroupingPolicy {
    /// Hard maximum section size in characters
    pub max_chars: usize,

    /// Soft threshold: once a section reaches this size, the next element
    /// starts a new section
    pub new_after_chars: usize,

    /// Sections smaller than this are merged into the following section
    pub combine_under_chars: usize,
}

impl From<&PartitionerConfig> for GroupingPolicy {
    fn from(config: &PartitionerConfig) -> Self {
        Self {
            max_chars: config.group_max_chars,
            new_after_chars: config.group_new_after_chars,
            combine_under_chars: config.group_combine_under_chars,
        }
    }
}

/// One grouped run of elements
#[derive(Debug, Clone)]
pub struct Section {
    /// Element texts joined with blank lines, in reading order
    pub text: String,

    /// Page number of the first contributing element, when known
    pub page_number: Option<u32>,
}

impl Section {
    fn new() -> Self {
        Self {
            text: String::new(),
            page_number: None,
        }
    }

    fn push(&mut self, text: &str, page_number: Option<u32>) {
        if !self.text.is_empty() {
            self.text.push_str(SECTION_SEPARATOR);
        }
        self.text.push_str(text);
        if self.page_number.is_none() {
            self.page_number = page_number;
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Groups elements into sections along title boundaries
///
/// Page breaks and whitespace-only elements are skipped. Sections may span
/// pages; the recorded page number is the first contributor's.
pub fn group_by_title(elements: &[ContentElement], policy: &GroupingPolicy) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::new();

    for element in elements {
        if element.kind == ElementKind::PageBreak {
            continue;
        }
        let text = element.text.trim();
        if text.is_empty() {
            continue;
        }

        let addition = if current.is_empty() {
            text.len()
        } else {
            text.len() + SECTION_SEPARATOR.len()
        };

        let closes = !current.is_empty()
            && (element.kind == ElementKind::Title
                || current.text.len() >= policy.new_after_chars
                || current.text.len() + addition > policy.max_chars);

        if closes {
            sections.push(std::mem::replace(&mut current, Section::new()));
        }

        current.push(text, element.page_number);
    }

    if !current.is_empty() {
        sections.push(current);
    }

    combine_small_sections(sections, policy)
}

/// Merges undersized sections into their successor
///
/// A lone trailing small section stays as-is; merging stops rather than
/// exceed the hard maximum.
fn combine_small_sections(sections: Vec<Section>, policy: &GroupingPolicy) -> Vec<Section> {
    let mut combined: Vec<Section> = Vec::with_capacity(sections.len());
    let mut iter = sections.into_iter();
    let mut current = match iter.next() {
        Some(first) => first,
        None => return combined,
    };

    for next in iter {
        let merged_len = current.text.len() + SECTION_SEPARATOR.len() + next.text.len();
        if current.text.len() < policy.combine_under_chars && merged_len <= policy.max_chars {
            current.push(&next.text, next.page_number);
        } else {
            combined.push(std::mem::replace(&mut current, next));
        }
    }

    combined.push(current);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GroupingPolicy {
        GroupingPolicy {
            max_chars: 1500,
            new_after_chars: 1200,
            combine_under_chars: 300,
        }
    }

    fn title(text: &str) -> ContentElement {
        ContentElement::new(ElementKind::Title, text.to_string(), None)
    }

    fn narrative(text: &str) -> ContentElement {
        ContentElement::new(ElementKind::NarrativeText, text.to_string(), None)
    }

    fn narrative_of_len(len: usize) -> ContentElement {
        narrative(&"x".repeat(len))
    }

    #[test]
    fn test_title_starts_new_section() {
        let elements = vec![
            title("First heading text long enough to stand"),
            narrative_of_len(400),
            title("Second heading text long enough to stand"),
            narrative_of_len(400),
        ];

        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 2);
        assert!(sections[0].text.starts_with("First heading"));
        assert!(sections[1].text.starts_with("Second heading"));
    }

    #[test]
    fn test_section_joins_with_blank_line() {
        let elements = vec![title("Heading over the combine threshold padding pad"), narrative("Body text.")];
        let mut p = policy();
        p.combine_under_chars = 0;

        let sections = group_by_title(&elements, &p);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].text.contains("\n\n"));
    }

    #[test]
    fn test_soft_threshold_closes_section() {
        let elements = vec![narrative_of_len(800), narrative_of_len(500), narrative_of_len(100)];

        // 800 + 500 crosses new_after_chars, so the third element opens a
        // new section
        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text.len(), 800 + 2 + 500);
    }

    #[test]
    fn test_hard_maximum_not_exceeded_by_grouping() {
        let elements = vec![narrative_of_len(1000), narrative_of_len(600)];

        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.text.len() <= 1500));
    }

    #[test]
    fn test_oversized_single_element_kept_whole() {
        let elements = vec![narrative_of_len(2600)];

        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text.len(), 2600);
    }

    #[test]
    fn test_small_sections_combined() {
        let elements = vec![
            title("Short"),
            narrative_of_len(50),
            title("Also short"),
            narrative_of_len(50),
        ];

        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_combine_respects_hard_maximum() {
        let elements = vec![narrative_of_len(200), narrative_of_len(1400)];

        // Merging would reach 1602 > max_chars, so the small section stays
        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_page_breaks_and_blank_elements_skipped() {
        let elements = vec![
            narrative("Page one text."),
            ContentElement::new(ElementKind::PageBreak, String::new(), Some(2)),
            narrative("   "),
            narrative("Page two text."),
        ];
        let mut p = policy();
        p.combine_under_chars = 0;

        let sections = group_by_title(&elements, &p);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, "Page one text.\n\nPage two text.");
    }

    #[test]
    fn test_page_number_from_first_contributor() {
        let elements = vec![
            ContentElement::new(ElementKind::NarrativeText, "a".repeat(400), Some(3)),
            ContentElement::new(ElementKind::NarrativeText, "b".repeat(400), Some(4)),
        ];

        let sections = group_by_title(&elements, &policy());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].page_number, Some(3));
    }

    #[test]
    fn test_empty_input() {
        let sections = group_by_title(&[], &policy());
        assert!(sections.is_empty());
    }
}
