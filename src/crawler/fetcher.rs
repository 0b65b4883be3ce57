//! HTTP fetching
//!
//! One shared reqwest client fetches pages and referenced documents. The
//! response body is read chunk by chunk against the configured size cap,
//! so an oversized document is abandoned mid-transfer instead of being
//! buffered whole.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::Config;
use crate::{LexcrawlError, Result};

/// A fetched resource after redirects
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Media type: the Content-Type value up to any parameters
    pub content_type: String,

    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Builds the shared HTTP client
///
/// The User-Agent identifies the crawler and its operator:
/// `Name/Version (+contact-url; contact-email)`. Redirects are followed up
/// to the configured hop cap.
pub fn build_http_client(config: &Config) -> Result<Client> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.user_agent.crawler_name,
        config.user_agent.crawler_version,
        config.user_agent.contact_url,
        config.user_agent.contact_email
    );

    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(config.crawler.max_redirects as usize))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetcher with a streaming response-size cap
pub struct Fetcher {
    client: Client,
    max_response_bytes: u64,
}

impl Fetcher {
    pub fn new(client: Client, max_response_bytes: u64) -> Self {
        Self {
            client,
            max_response_bytes,
        }
    }

    /// Fetches one URL
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - a 2xx response within the size cap
    /// * `Err(LexcrawlError::HttpStatus)` - the server answered non-2xx
    /// * `Err(LexcrawlError::Timeout)` - the request timed out
    /// * `Err(LexcrawlError::TooLarge)` - the body exceeded the size cap
    /// * `Err(LexcrawlError::Http)` - any other transport failure
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| classify_transport_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LexcrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_response_bytes {
                return Err(self.too_large(url));
            }
        }

        let final_url = response.url().to_string();
        let content_type = media_type(&response);

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| classify_transport_error(url, source))?
        {
            if body.len() as u64 + chunk.len() as u64 > self.max_response_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResponse {
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn too_large(&self, url: &str) -> LexcrawlError {
        LexcrawlError::TooLarge {
            url: url.to_string(),
            limit: self.max_response_bytes,
        }
    }
}

/// Media type of a response, defaulting when the header is absent
fn media_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn classify_transport_error(url: &str, source: reqwest::Error) -> LexcrawlError {
    if source.is_timeout() {
        LexcrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        LexcrawlError::Http {
            url: url.to_string(),
            source,
        }
    }
}
