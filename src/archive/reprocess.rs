use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::{ArchiveError, ArchivedDocument, ArchivedPage, ObjectStore};
use crate::chunk::Chunker;
use crate::docmeta::DocumentMetadata;
use crate::ingest::IngestGate;
use crate::partition::ParserPipeline;
use crate::Result;

/// Upper bound on reprocess workers regardless of core count
const MAX_WORKERS: usize = 32;

/// Outcome of replaying one archived session
#[derive(Debug, Serialize)]
pub struct ReprocessSummary {
    pub session_id: String,
    pub processed: u64,
    pub stored: u64,
    pub errors: u64,
    pub elapsed_seconds: f64,
    pub docs_per_second: f64,
}

/// Replays archived sessions through the partition, chunk, and ingest
/// pipeline
///
/// Pages are independent, so each page's metadata record becomes one
/// task; a bounded worker pool keeps object reads and store writes from
/// piling up.
pub struct Reprocessor {
    store: Arc<dyn ObjectStore>,
    pipeline: Arc<ParserPipeline>,
    chunker: Arc<Chunker>,
    gate: Arc<IngestGate>,
}

impl Reprocessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        pipeline: Arc<ParserPipeline>,
        chunker: Arc<Chunker>,
        gate: Arc<IngestGate>,
    ) -> Self {
        Self {
            store,
            pipeline,
            chunker,
            gate,
        }
    }

    /// Archived session ids, newest first
    pub async fn list_sessions(&self) -> std::result::Result<Vec<String>, ArchiveError> {
        let keys = self.store.list("").await?;
        let mut sessions: Vec<String> = keys
            .iter()
            .filter_map(|key| key.split_once('/').map(|(session, _)| session.to_string()))
            .collect();
        sessions.sort();
        sessions.dedup();
        sessions.reverse();
        Ok(sessions)
    }

    /// Replays one session, the latest when none is named
    pub async fn reprocess(&self, session: Option<&str>) -> Result<ReprocessSummary> {
        let session_id = match session {
            Some(id) => id.to_string(),
            None => self
                .list_sessions()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ArchiveError::NotFound("no archived sessions".to_string()))?,
        };

        let started = Instant::now();
        let keys = self.store.list(&format!("{session_id}/")).await?;
        let metadata_keys: Vec<String> = keys
            .into_iter()
            .filter(|key| key.ends_with("/metadata.json"))
            .collect();

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(MAX_WORKERS);
        info!(
            session = %session_id,
            pages = metadata_keys.len(),
            workers,
            "reprocessing archived session"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        for key in metadata_keys {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let pipeline = self.pipeline.clone();
            let chunker = self.chunker.clone();
            let gate = self.gate.clone();
            let session_id = session_id.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return PageOutcome { stored: 0, errors: 1 };
                };
                reprocess_page(&*store, &pipeline, &chunker, &gate, &session_id, &key).await
            });
        }

        let mut processed = 0u64;
        let mut stored = 0u64;
        let mut errors = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    processed += 1;
                    stored += outcome.stored;
                    errors += outcome.errors;
                }
                Err(join_error) => {
                    errors += 1;
                    error!(%join_error, "reprocess task failed");
                }
            }
        }

        let elapsed_seconds = started.elapsed().as_secs_f64();
        let summary = ReprocessSummary {
            docs_per_second: if elapsed_seconds > 0.0 {
                processed as f64 / elapsed_seconds
            } else {
                0.0
            },
            session_id,
            processed,
            stored,
            errors,
            elapsed_seconds,
        };
        info!(
            session = %summary.session_id,
            processed = summary.processed,
            stored = summary.stored,
            errors = summary.errors,
            elapsed_seconds = summary.elapsed_seconds,
            "reprocess complete"
        );
        Ok(summary)
    }
}

struct PageOutcome {
    stored: u64,
    errors: u64,
}

/// Replays every document archived with one page record
async fn reprocess_page(
    store: &dyn ObjectStore,
    pipeline: &ParserPipeline,
    chunker: &Chunker,
    gate: &IngestGate,
    session_id: &str,
    metadata_key: &str,
) -> PageOutcome {
    let page: ArchivedPage = match store.get(metadata_key).await {
        Ok(raw) => match serde_json::from_slice(&raw) {
            Ok(page) => page,
            Err(error) => {
                warn!(key = metadata_key, %error, "malformed page record");
                return PageOutcome { stored: 0, errors: 1 };
            }
        },
        Err(error) => {
            warn!(key = metadata_key, %error, "failed to read page record");
            return PageOutcome { stored: 0, errors: 1 };
        }
    };

    let mut outcome = PageOutcome {
        stored: 0,
        errors: 0,
    };
    for document in &page.documents {
        match reprocess_document(store, pipeline, chunker, gate, &page.metadata, session_id, document)
            .await
        {
            Ok(stored) => outcome.stored += stored,
            Err(error) => {
                warn!(url = %document.url, %error, "failed to reprocess document");
                outcome.errors += 1;
            }
        }
    }
    outcome
}

async fn reprocess_document(
    store: &dyn ObjectStore,
    pipeline: &ParserPipeline,
    chunker: &Chunker,
    gate: &IngestGate,
    metadata: &DocumentMetadata,
    session_id: &str,
    document: &ArchivedDocument,
) -> Result<u64> {
    let body = store.get(&document.key).await?;
    let elements = pipeline.process(&body, &document.url, Some(&document.content_type))?;
    let chunks = chunker.chunk(&elements, &document.url);
    let receipt = gate
        .ingest(&chunks, Some(metadata), Some(session_id))
        .await?;
    Ok(receipt.stored as u64)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Value;

    use super::*;
    use crate::archive::{FetchedDocument, FsObjectStore, SessionArchive};
    use crate::config::ChunkerConfig;
    use crate::partition::{
        GenericHtmlParser, GroupingPolicy, LegalSourceHtmlParser, PdfParser,
        PrimarySiteHtmlParser,
    };
    use crate::store::MemoryVectorStore;

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

    fn metadata(url: &str) -> DocumentMetadata {
        DocumentMetadata {
            url: url.to_string(),
            title: "Circular CSSF 22/810".to_string(),
            subtitle: String::new(),
            document_type: "Circular".to_string(),
            document_number: "CSSF 22-810".to_string(),
            publication_date: None,
            update_date: None,
            top_related: Vec::new(),
            bottom_related: Vec::new(),
            themes: Vec::new(),
            entities: Vec::new(),
            keywords: Vec::new(),
            lang: "en".to_string(),
            super_category: "post".to_string(),
            content_hash: "abc".to_string(),
            crawl_timestamp: Utc::now(),
            file_size: 10,
        }
    }

    async fn seed_session(store: Arc<FsObjectStore>, session_id: &str, page_text: &str) {
        let archive = SessionArchive::with_session_id(store, session_id.to_string());
        let url = "https://www.cssf.lu/en/2022/07/circular-cssf-22-810/";
        let body = format!(
            r#"<html><body><div class="content-section"><h2>Scope</h2><p>{page_text}</p></div></body></html>"#
        );
        archive
            .archive_page(
                &metadata(url),
                &[FetchedDocument {
                    url: url.to_string(),
                    content_type: "text/html".to_string(),
                    body: body.into_bytes(),
                }],
            )
            .await
            .unwrap();
    }

    fn reprocessor(store: Arc<FsObjectStore>, vectors: Arc<MemoryVectorStore>) -> Reprocessor {
        Reprocessor::new(
            store,
            Arc::new(pipeline()),
            Arc::new(Chunker::new(&ChunkerConfig::default())),
            Arc::new(IngestGate::new(vectors)),
        )
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        seed_session(store.clone(), "20220101_080000", "older run content").await;
        seed_session(store.clone(), "20230615_120000", "newer run content").await;

        let vectors = Arc::new(MemoryVectorStore::new());
        let sessions = reprocessor(store, vectors).list_sessions().await.unwrap();
        assert_eq!(sessions, vec!["20230615_120000", "20220101_080000"]);
    }

    #[tokio::test]
    async fn test_reprocess_defaults_to_latest_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        seed_session(store.clone(), "20220101_080000", "older run content").await;
        seed_session(store.clone(), "20230615_120000", "newer run content").await;

        let vectors = Arc::new(MemoryVectorStore::new());
        let summary = reprocessor(store, vectors.clone())
            .reprocess(None)
            .await
            .unwrap();

        assert_eq!(summary.session_id, "20230615_120000");
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.errors, 0);
        assert!(summary.stored >= 1);
        assert!(vectors.texts().iter().any(|t| t.contains("newer run content")));
    }

    #[tokio::test]
    async fn test_reprocessed_chunks_carry_session_and_document_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        seed_session(store.clone(), "20230615_120000", "supervisory expectations").await;

        let vectors = Arc::new(MemoryVectorStore::new());
        reprocessor(store, vectors.clone())
            .reprocess(Some("20230615_120000"))
            .await
            .unwrap();

        let record = &vectors.metadatas()[0];
        assert_eq!(record["title"], "Circular CSSF 22/810");
        let complex: Value =
            serde_json::from_str(record["complex_metadata"].as_str().unwrap()).unwrap();
        assert_eq!(complex["crawl_session"], "20230615_120000");
    }

    #[tokio::test]
    async fn test_malformed_page_record_counts_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        store
            .put("20230615_120000/broken/metadata.json", b"not json", "application/json")
            .await
            .unwrap();

        let vectors = Arc::new(MemoryVectorStore::new());
        let summary = reprocessor(store, vectors)
            .reprocess(Some("20230615_120000"))
            .await
            .unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.stored, 0);
    }

    #[tokio::test]
    async fn test_empty_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let vectors = Arc::new(MemoryVectorStore::new());

        assert!(reprocessor(store, vectors).reprocess(None).await.is_err());
    }
}
