use serde_json::{json, Value};

use crate::chunk::Chunk;
use crate::docmeta::DocumentMetadata;

/// Builds the flat metadata record stored beside one chunk
///
/// Store payload fields are scalar, so list-valued document metadata is
/// carried twice: pipe-joined `*_text` columns for filtering, and a
/// `complex_metadata` JSON string preserving the original values.
/// Pages without a publication-page record (affiliated legal domains,
/// generic pages) get the chunk-level fields only.
pub fn flatten(
    chunk: &Chunk,
    doc_id: &str,
    document: Option<&DocumentMetadata>,
    crawl_session: Option<&str>,
) -> Value {
    let Some(doc) = document else {
        return json!({
            "doc_id": doc_id,
            "url": chunk.source_url,
            "chunk_type": chunk.kind.as_str(),
            "chunk_index": chunk.index,
            "is_split_chunk": chunk.is_split_chunk,
            "subsection_index": chunk.subsection_index,
            "page_number": chunk.page_number,
            "crawl_session": crawl_session.unwrap_or(""),
        });
    };

    let complex_metadata = json!({
        "content_hash": doc.content_hash,
        "top_related": doc.top_related,
        "bottom_related": doc.bottom_related,
        "entities": doc.entities,
        "keywords": doc.keywords,
        "themes": doc.themes,
        "crawl_session": crawl_session.unwrap_or(""),
        "source": chunk.source_url,
    })
    .to_string();

    json!({
        "doc_id": doc_id,
        "url": chunk.source_url,
        "title": doc.title,
        "subtitle": doc.subtitle,
        "document_type": doc.document_type,
        "document_number": doc.document_number,
        "lang": doc.lang,
        "super_category": doc.super_category,
        "publication_date": doc.publication_date.as_deref().unwrap_or(""),
        "update_date": doc.update_date.as_deref().unwrap_or(""),
        "content_hash": doc.content_hash,
        "crawl_timestamp": doc.crawl_timestamp.to_rfc3339(),
        "file_size": doc.file_size,
        "entities_text": doc.entities.join(" | "),
        "keywords_text": doc.keywords.join(" | "),
        "themes_text": doc.themes.join(" | "),
        "chunk_type": chunk.kind.as_str(),
        "chunk_index": chunk.index,
        "is_split_chunk": chunk.is_split_chunk,
        "subsection_index": chunk.subsection_index,
        "page_number": chunk.page_number,
        "complex_metadata": complex_metadata,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::chunk::ChunkKind;

    fn chunk() -> Chunk {
        Chunk {
            text: "The institution shall notify the competent authority.".to_string(),
            source_url: "https://www.cssf.lu/en/2022/07/circular-cssf-22-810/".to_string(),
            kind: ChunkKind::TitleSection,
            is_split_chunk: false,
            subsection_index: None,
            index: 2,
            page_number: Some(3),
        }
    }

    fn document() -> DocumentMetadata {
        DocumentMetadata {
            url: "https://www.cssf.lu/en/2022/07/circular-cssf-22-810/".to_string(),
            title: "Circular CSSF 22/810".to_string(),
            subtitle: "UCI administrators".to_string(),
            document_type: "Circular".to_string(),
            document_number: "CSSF 22-810".to_string(),
            publication_date: Some("12 July 2022".to_string()),
            update_date: None,
            top_related: vec!["https://www.cssf.lu/doc.pdf".to_string()],
            bottom_related: vec![],
            themes: vec!["UCI".to_string(), "Governance".to_string()],
            entities: vec!["Investment fund managers".to_string()],
            keywords: vec![],
            lang: "en".to_string(),
            super_category: "post".to_string(),
            content_hash: "abc123".to_string(),
            crawl_timestamp: Utc::now(),
            file_size: 2048,
        }
    }

    #[test]
    fn test_flattens_document_fields() {
        let record = flatten(&chunk(), "fp-1", Some(&document()), Some("20220712_090000"));

        assert_eq!(record["doc_id"], "fp-1");
        assert_eq!(record["title"], "Circular CSSF 22/810");
        assert_eq!(record["document_number"], "CSSF 22-810");
        assert_eq!(record["publication_date"], "12 July 2022");
        assert_eq!(record["update_date"], "");
        assert_eq!(record["themes_text"], "UCI | Governance");
        assert_eq!(record["chunk_type"], "title_section");
        assert_eq!(record["chunk_index"], 2);
        assert_eq!(record["page_number"], 3);
        assert_eq!(record["is_split_chunk"], false);
    }

    #[test]
    fn test_complex_metadata_round_trips_lists() {
        let record = flatten(&chunk(), "fp-1", Some(&document()), Some("20220712_090000"));

        let complex: Value =
            serde_json::from_str(record["complex_metadata"].as_str().unwrap()).unwrap();
        assert_eq!(complex["top_related"][0], "https://www.cssf.lu/doc.pdf");
        assert_eq!(complex["themes"][1], "Governance");
        assert_eq!(complex["crawl_session"], "20220712_090000");
    }

    #[test]
    fn test_bare_record_without_document() {
        let record = flatten(&chunk(), "fp-9", None, None);

        assert_eq!(record["doc_id"], "fp-9");
        assert_eq!(
            record["url"],
            "https://www.cssf.lu/en/2022/07/circular-cssf-22-810/"
        );
        assert_eq!(record["crawl_session"], "");
        assert!(record.get("title").is_none());
        assert!(record.get("complex_metadata").is_none());
    }

    #[test]
    fn test_split_chunk_fields() {
        let mut split = chunk();
        split.kind = ChunkKind::TitleSubsection;
        split.is_split_chunk = true;
        split.subsection_index = Some(1);

        let record = flatten(&split, "fp-2", None, None);
        assert_eq!(record["chunk_type"], "title_subsection");
        assert_eq!(record["is_split_chunk"], true);
        assert_eq!(record["subsection_index"], 1);
    }
}
