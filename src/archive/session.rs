use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ArchiveError, ObjectStore};
use crate::docmeta::DocumentMetadata;

/// A document fetched for archival alongside its page
pub struct FetchedDocument {
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Record of one archived document object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedDocument {
    pub url: String,
    pub key: String,
    pub content_type: String,
}

/// The archived form of one publication page: its metadata record plus
/// the object-store records of every document archived with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedPage {
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
    pub documents: Vec<ArchivedDocument>,
}

/// End-of-run summary written next to the archived pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub session_id: String,

    /// Hash of the configuration that produced the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub processed: Vec<String>,
    pub errors: Vec<ErrorRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,
    pub error: String,
}

/// Writer for one crawl session's archive
///
/// The session id doubles as the key prefix for everything the run
/// writes, so sessions sort chronologically in a plain key listing.
pub struct SessionArchive {
    session_id: String,
    store: Arc<dyn ObjectStore>,
    report: Mutex<StatusReport>,
}

impl SessionArchive {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_session_id(store, Utc::now().format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn with_session_id(store: Arc<dyn ObjectStore>, session_id: String) -> Self {
        let report = StatusReport {
            session_id: session_id.clone(),
            config_hash: None,
            start_time: Utc::now(),
            end_time: None,
            processed: Vec::new(),
            errors: Vec::new(),
        };
        Self {
            session_id,
            store,
            report: Mutex::new(report),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ties the session to the configuration that produced it
    pub fn set_config_hash(&self, hash: &str) {
        self.report.lock().unwrap().config_hash = Some(hash.to_string());
    }

    /// Key prefix for one page: the URL path with slashes turned into
    /// dashes, under the session prefix
    pub fn page_key(&self, url: &str) -> String {
        let path = Url::parse(url)
            .map(|parsed| parsed.path().trim_matches('/').replace('/', "-"))
            .unwrap_or_default();
        if path.is_empty() {
            format!("{}/index", self.session_id)
        } else {
            format!("{}/{}", self.session_id, path)
        }
    }

    /// Archives one page's metadata record and its fetched documents
    ///
    /// A document that fails to write is logged and left out of the
    /// record; a page whose `metadata.json` fails to write is an error.
    pub async fn archive_page(
        &self,
        metadata: &DocumentMetadata,
        documents: &[FetchedDocument],
    ) -> Result<Vec<ArchivedDocument>, ArchiveError> {
        let folder = self.page_key(&metadata.url);

        let mut archived = Vec::new();
        for document in documents {
            let key = format!("{}/{}", folder, URL_SAFE.encode(&document.url));
            match self
                .store
                .put(&key, &document.body, &document.content_type)
                .await
            {
                Ok(()) => archived.push(ArchivedDocument {
                    url: document.url.clone(),
                    key,
                    content_type: document.content_type.clone(),
                }),
                Err(error) => warn!(url = %document.url, %error, "failed to archive document"),
            }
        }

        let page = ArchivedPage {
            metadata: metadata.clone(),
            documents: archived.clone(),
        };
        let body = serde_json::to_vec_pretty(&page)?;
        let metadata_key = format!("{folder}/metadata.json");
        self.store
            .put(&metadata_key, &body, "application/json")
            .await?;
        debug!(key = %metadata_key, documents = archived.len(), "page archived");

        Ok(archived)
    }

    pub fn record_processed(&self, url: &str) {
        self.report.lock().unwrap().processed.push(url.to_string());
    }

    pub fn record_error(&self, url: &str, error: &str) {
        self.report.lock().unwrap().errors.push(ErrorRecord {
            url: url.to_string(),
            error: error.to_string(),
        });
    }

    /// Stamps the end time and writes the session status report
    pub async fn finalize(&self) -> Result<(), ArchiveError> {
        let report = {
            let mut report = self.report.lock().unwrap();
            report.end_time = Some(Utc::now());
            report.clone()
        };
        let body = serde_json::to_vec_pretty(&report)?;
        let key = format!("{}/status_report.json", self.session_id);
        self.store.put(&key, &body, "application/json").await
    }
}
