//! In-memory vector store for tests and dry runs

use std::sync::Mutex;

use async_trait::async_trait;

use super::{SearchHit, StoreError, StoreReceipt, VectorStore};

/// Stores records in process memory and ranks search by term overlap
///
/// No embeddings are computed; scoring is the fraction of query terms
/// present in a record. Good enough to exercise the pipeline end to end
/// without a gateway.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    records: Mutex<Vec<StoredRecord>>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    text: String,
    metadata: serde_json::Value,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored texts in insertion order
    pub fn texts(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    /// Stored metadata records in insertion order
    pub fn metadatas(&self) -> Vec<serde_json::Value> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.metadata.clone())
            .collect()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: &[serde_json::Value],
    ) -> Result<StoreReceipt, StoreError> {
        if texts.is_empty() {
            return Ok(StoreReceipt::default());
        }
        if texts.len() != metadatas.len() {
            return Err(StoreError::InvalidResponse(format!(
                "texts/metadatas length mismatch: {} vs {}",
                texts.len(),
                metadatas.len()
            )));
        }

        let mut records = self.records.lock().unwrap();
        let mut ids = Vec::with_capacity(texts.len());
        for (text, metadata) in texts.iter().zip(metadatas) {
            ids.push(format!("mem-{}", records.len()));
            records.push(StoredRecord {
                text: text.clone(),
                metadata: metadata.clone(),
            });
        }

        Ok(StoreReceipt {
            count: ids.len(),
            ids,
        })
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.records.lock().unwrap();
        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter_map(|record| {
                let text = record.text.to_lowercase();
                let matched = terms.iter().filter(|t| text.contains(t.as_str())).count();
                if matched == 0 {
                    return None;
                }
                Some(SearchHit {
                    content: record.text.clone(),
                    score: matched as f32 / terms.len() as f32,
                    metadata: record.metadata.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_and_count() {
        let store = MemoryVectorStore::new();
        let receipt = store
            .add_texts(
                &["first text".to_string(), "second text".to_string()],
                &[json!({"url": "a"}), json!({"url": "b"})],
            )
            .await
            .unwrap();

        assert_eq!(receipt.count, 2);
        assert_eq!(receipt.ids.len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let store = MemoryVectorStore::new();
        let receipt = store.add_texts(&[], &[]).await.unwrap();
        assert_eq!(receipt.count, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let store = MemoryVectorStore::new();
        let result = store
            .add_texts(&["text".to_string()], &[])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_ranks_by_term_overlap() {
        let store = MemoryVectorStore::new();
        store
            .add_texts(
                &[
                    "credit institutions own funds requirements".to_string(),
                    "annual report of the commission".to_string(),
                ],
                &[json!({}), json!({})],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search("own funds requirements", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("own funds"));
        assert!(hits[0].score > 0.9);
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let store = MemoryVectorStore::new();
        let texts: Vec<String> = (0..10).map(|i| format!("circular number {i}")).collect();
        let metadatas = vec![json!({}); 10];
        store.add_texts(&texts, &metadatas).await.unwrap();

        let hits = store.similarity_search("circular", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }
}
