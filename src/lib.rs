//! Lexcrawl: a regulatory-publication crawl-and-ingest pipeline
//!
//! This crate implements a focused crawler that walks a regulatory publication
//! site and its affiliated legal-reference domains, extracts structured text
//! from HTML pages and PDF documents, splits it into retrieval-sized chunks,
//! and stores deduplicated chunks with metadata in a vector index.

pub mod archive;
pub mod chunk;
pub mod config;
pub mod crawler;
pub mod docmeta;
pub mod ingest;
pub mod partition;
pub mod report;
pub mod robots;
pub mod rules;
pub mod state;
pub mod storage;
pub mod store;

use thiserror::Error;

/// Main error type for Lexcrawl operations
#[derive(Debug, Error)]
pub enum LexcrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Response body for {url} exceeds size cap of {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Archive error: {0}")]
    Archive(#[from] archive::ArchiveError),

    #[error("Partition error: {0}")]
    Partition(#[from] partition::PartitionError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid rule pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Lexcrawl operations
pub type Result<T> = std::result::Result<T, LexcrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkKind};
pub use config::Config;
pub use partition::{ContentElement, ElementKind};
pub use rules::{canonicalize_url, DomainTier, UrlRules};
pub use state::PageState;
