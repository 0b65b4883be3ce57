//! Deduplicated ingestion into the vector store
//!
//! Every chunk passes a fingerprint gate before storage. The gate keeps
//! one in-memory set of admitted fingerprints for the whole run: a chunk
//! whose fingerprint is already present is dropped, everything else is
//! stored in one batch per page. Fingerprints are recorded before the
//! store call and stay recorded if it fails, so a failed batch is not
//! retried with different-looking duplicates later.

mod fingerprint;
mod metadata;
mod seen;

use std::sync::Arc;

use tracing::debug;

pub use fingerprint::fingerprint;
pub use metadata::flatten;
pub use seen::SeenSet;

use crate::chunk::Chunk;
use crate::docmeta::DocumentMetadata;
use crate::store::{StoreError, VectorStore};

/// What happened to one batch of chunks at the gate
#[derive(Debug, Default)]
pub struct IngestReceipt {
    /// Chunks offered to the gate
    pub submitted: usize,
    /// Chunks dropped because their fingerprint was already admitted
    pub duplicates: usize,
    /// Chunks the store confirmed
    pub stored: usize,
    /// Fingerprints newly admitted by this batch
    pub fingerprints: Vec<String>,
}

/// The dedup gate in front of the vector store
pub struct IngestGate {
    seen: SeenSet,
    store: Arc<dyn VectorStore>,
}

impl IngestGate {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            seen: SeenSet::new(),
            store,
        }
    }

    /// Seeds the gate from persisted fingerprints when resuming a run
    pub fn restore_fingerprints<I>(&self, fingerprints: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.seen.restore(fingerprints);
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Filters one page's chunks through the gate and stores the survivors
    ///
    /// `document` carries the publication-page metadata for primary-site
    /// pages; `crawl_session` the archive session the page belongs to.
    pub async fn ingest(
        &self,
        chunks: &[Chunk],
        document: Option<&DocumentMetadata>,
        crawl_session: Option<&str>,
    ) -> Result<IngestReceipt, StoreError> {
        if chunks.is_empty() {
            return Ok(IngestReceipt::default());
        }

        let fingerprints: Vec<String> = chunks
            .iter()
            .map(|chunk| fingerprint(&chunk.text, &chunk.source_url))
            .collect();
        let fresh = self.seen.admit(&fingerprints);
        let duplicates = chunks.len() - fresh.len();

        if fresh.is_empty() {
            debug!(submitted = chunks.len(), "all chunks already stored");
            return Ok(IngestReceipt {
                submitted: chunks.len(),
                duplicates,
                ..IngestReceipt::default()
            });
        }

        let mut texts = Vec::with_capacity(fresh.len());
        let mut metadatas = Vec::with_capacity(fresh.len());
        for &index in &fresh {
            texts.push(chunks[index].text.clone());
            metadatas.push(flatten(
                &chunks[index],
                &fingerprints[index],
                document,
                crawl_session,
            ));
        }

        let receipt = self.store.add_texts(&texts, &metadatas).await?;
        debug!(
            submitted = chunks.len(),
            duplicates,
            stored = receipt.count,
            "chunk batch stored"
        );

        Ok(IngestReceipt {
            submitted: chunks.len(),
            duplicates,
            stored: receipt.count,
            fingerprints: fresh
                .into_iter()
                .map(|index| fingerprints[index].clone())
                .collect(),
        })
    }
}
