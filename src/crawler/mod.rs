//! Crawler orchestration
//!
//! This module contains the crawl machinery:
//! - HTTP fetching with a streaming size cap
//! - Link extraction from fetched pages
//! - Concurrency limiting and per-host politeness
//! - The coordinator driving fetch, partition, and ingest

mod coordinator;
mod fetcher;
mod links;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchResponse, Fetcher};
pub use links::extract_links;
pub use scheduler::Scheduler;
