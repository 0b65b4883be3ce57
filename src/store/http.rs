//! HTTP vector-store gateway client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SearchHit, StoreError, StoreReceipt, VectorStore};
use crate::config::StoreConfig;

/// Client for the embedding gateway
///
/// `POST {base}/documents` upserts a batch, `POST {base}/search` runs a
/// similarity query, `GET {base}/health` probes readiness. Requests are
/// retried on 429 and server errors with exponential backoff; the health
/// probe is a single attempt so startup fails fast.
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl HttpVectorStore {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
        })
    }

    /// Builds the client from the store configuration section
    ///
    /// # Arguments
    ///
    /// * `config` - Store section; `base_url` must be set
    /// * `timeout` - Per-request timeout shared with the fetcher
    pub fn from_config(config: &StoreConfig, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| StoreError::InvalidResponse("store.base-url is not set".to_string()))?;
        Self::new(base_url, timeout, config.max_retries as usize)
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, StoreError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0usize;

        loop {
            match self.client.post(&url).json(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Resp>()
                            .await
                            .map_err(|e| StoreError::InvalidResponse(e.to_string()));
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%url, %status, attempt, "store request failed, retrying");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(StoreError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if (err.is_connect() || err.is_timeout() || err.is_request())
                        && attempt + 1 < self.max_retries
                    {
                        attempt += 1;
                        warn!(%url, error = %err, attempt, "store unreachable, retrying");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
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

        let request = AddDocumentsRequest { texts, metadatas };
        let response: AddDocumentsResponse = self.post_json("/documents", &request).await?;
        debug!(count = response.count, "stored batch");
        Ok(StoreReceipt {
            count: response.count,
            ids: response.ids,
        })
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let request = SearchRequest { query, top_k };
        let response: SearchResponse = self.post_json("/search", &request).await?;
        Ok(response
            .results
            .into_iter()
            .map(|hit| SearchHit {
                content: hit.content,
                score: hit.score,
                metadata: hit.metadata,
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unhealthy(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unhealthy(format!(
                "{} returned {}",
                url,
                response.status()
            )))
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct AddDocumentsRequest<'a> {
    texts: &'a [String],
    metadatas: &'a [serde_json::Value],
}

#[derive(Debug, Deserialize)]
struct AddDocumentsResponse {
    count: usize,
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHitPayload>,
}

#[derive(Debug, Deserialize)]
struct SearchHitPayload {
    content: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_doubles_and_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(retry_backoff(5), Duration::from_millis(16000));
        assert_eq!(retry_backoff(9), Duration::from_millis(16000));
    }

    #[test]
    fn test_should_retry_classification() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::BAD_REQUEST));
        assert!(!should_retry(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store =
            HttpVectorStore::new("http://localhost:9200/", Duration::from_secs(5), 3).unwrap();
        assert_eq!(store.base_url, "http://localhost:9200");
    }
}
