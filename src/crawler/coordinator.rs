//! Crawl orchestration
//!
//! The coordinator owns the crawl: it seeds the frontier from the
//! configured seed URLs, spawns one task per admitted URL up to the
//! concurrency cap, and folds each finished page back into the frontier,
//! the run report, the session archive, and the resume database. Page
//! tasks share the rules engine, robots gate, scheduler, and ingest gate
//! through `Arc`s; the frontier, the report, and the resume store stay on
//! the drive loop and are only touched between joins, so none of them
//! need locking.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::archive::{FetchedDocument, FsObjectStore, SessionArchive};
use crate::chunk::Chunker;
use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchResponse, Fetcher};
use crate::crawler::links::extract_links;
use crate::crawler::scheduler::Scheduler;
use crate::docmeta::{self, DocumentMetadata};
use crate::ingest::{IngestGate, IngestReceipt};
use crate::partition::ParserPipeline;
use crate::report::RunReport;
use crate::robots::RobotsGate;
use crate::rules::{canonicalize_url, DomainTier, UrlRules};
use crate::state::PageState;
use crate::storage::{ResumeStore, RunStatus};
use crate::store::VectorStore;
use crate::{LexcrawlError, Result};

/// Drives one crawl run end to end
pub struct Coordinator {
    config: Arc<Config>,
    rules: Arc<UrlRules>,
    robots: Arc<RobotsGate>,
    scheduler: Arc<Scheduler>,
    fetcher: Arc<Fetcher>,
    pipeline: Arc<ParserPipeline>,
    chunker: Arc<Chunker>,
    gate: Arc<IngestGate>,
    archive: Option<Arc<SessionArchive>>,
    resume: Option<ResumeStore>,
    run_id: Option<i64>,
    session_id: String,
    report: RunReport,
}

impl Coordinator {
    /// Wires up a crawl from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The full configuration
    /// * `store` - Vector store gateway receiving the ingested chunks
    /// * `resume` - Resume database, if persistence is enabled
    /// * `restore` - Restore visited URLs and fingerprints from the
    ///   resume database instead of starting clean
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(LexcrawlError)` - A rule failed to compile, the HTTP client
    ///   could not be built, or the resume database was unusable
    pub fn new(
        config: Config,
        store: Arc<dyn VectorStore>,
        resume: Option<ResumeStore>,
        restore: bool,
    ) -> Result<Self> {
        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();

        let client = build_http_client(&config)?;
        let rules = Arc::new(UrlRules::new(&config.rules)?);
        let robots = Arc::new(RobotsGate::from_config(client.clone(), &config));
        let scheduler = Arc::new(Scheduler::new(&config.crawler));
        let fetcher = Arc::new(Fetcher::new(client, config.crawler.max_response_bytes));
        let pipeline = Arc::new(ParserPipeline::from_config(&config));
        let chunker = Arc::new(Chunker::new(&config.chunker));
        let gate = Arc::new(IngestGate::new(store));

        let archive = if config.archive.enabled {
            let objects = Arc::new(FsObjectStore::new(config.archive.root.clone()));
            Some(Arc::new(SessionArchive::with_session_id(
                objects,
                session_id.clone(),
            )))
        } else {
            None
        };

        let mut resume = resume;
        let mut run_id = None;
        if let Some(resume_store) = resume.as_mut() {
            if restore {
                rules.restore_visited(resume_store.load_visited()?);
                gate.restore_fingerprints(resume_store.load_fingerprints()?);
                info!(
                    visited = rules.visited_count(),
                    fingerprints = gate.seen_count(),
                    "restored crawl state"
                );
            } else {
                resume_store.fresh_start()?;
            }
            run_id = Some(resume_store.begin_run(&session_id)?);
        }

        Ok(Self {
            config: Arc::new(config),
            rules,
            robots,
            scheduler,
            fetcher,
            pipeline,
            chunker,
            gate,
            archive,
            resume,
            run_id,
            session_id,
            report: RunReport::new(),
        })
    }

    /// Identifier of this run, shared with the session archive
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Records the configuration hash in the session status report
    pub fn set_config_hash(&self, hash: &str) {
        if let Some(archive) = &self.archive {
            archive.set_config_hash(hash);
        }
    }

    /// Runs the crawl to completion
    ///
    /// The loop keeps up to `max-concurrent-requests` page tasks in
    /// flight and stops admitting new URLs once a page or item bound is
    /// reached; tasks already in flight drain normally.
    pub async fn run(&mut self) -> Result<RunReport> {
        let started = Instant::now();

        let mut frontier: VecDeque<String> = VecDeque::new();
        let seeds = self.config.crawler.seed_urls.clone();
        for seed in &seeds {
            self.enqueue(seed, &mut frontier)?;
        }

        info!(
            seeds = frontier.len(),
            session = %self.session_id,
            "starting crawl"
        );

        let max_tasks = self.config.crawler.max_concurrent_requests.max(1) as usize;
        let mut tasks: JoinSet<PageOutcome> = JoinSet::new();
        let mut pages_started: u64 = 0;
        let mut pages_joined: u64 = 0;

        loop {
            while tasks.len() < max_tasks && !self.bound_reached(pages_started) {
                let Some(url) = frontier.pop_front() else {
                    break;
                };
                pages_started += 1;
                let task = self.page_task();
                tasks.spawn(task.process(url));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            pages_joined += 1;

            match joined {
                Ok(outcome) => self.absorb(outcome, &mut frontier)?,
                Err(error) => {
                    warn!(%error, "page task panicked");
                    self.report.errors += 1;
                }
            }

            if pages_joined % 10 == 0 {
                let rate = pages_joined as f64 / started.elapsed().as_secs_f64().max(0.001);
                info!(
                    fetched = self.report.fetched,
                    ingested = self.report.ingested,
                    chunks = self.report.chunks_stored,
                    queued = frontier.len(),
                    "crawled {} pages ({:.2} pages/s)",
                    pages_joined,
                    rate
                );
            }
        }

        if let Some(archive) = &self.archive {
            if let Err(error) = archive.finalize().await {
                warn!(%error, "failed to finalize session archive");
            }
        }

        if let (Some(resume), Some(run_id)) = (self.resume.as_mut(), self.run_id) {
            resume.finish_run(run_id, RunStatus::Completed)?;
        }

        info!(
            discovered = self.report.discovered,
            fetched = self.report.fetched,
            ingested = self.report.ingested,
            chunks = self.report.chunks_stored,
            duplicates = self.report.duplicate_chunks,
            errors = self.report.errors,
            "crawl complete"
        );

        Ok(self.report.clone())
    }

    /// Returns true once no further page task may start
    fn bound_reached(&self, pages_started: u64) -> bool {
        let crawler = &self.config.crawler;
        if crawler.max_pages > 0 && pages_started >= crawler.max_pages {
            return true;
        }
        if crawler.max_items > 0 && self.report.chunks_stored >= crawler.max_items {
            return true;
        }
        false
    }

    /// Admits one discovered URL into the frontier
    ///
    /// Exclusion rules and the domain allow-list drop the URL with a
    /// counter; an already-visited URL is dropped silently. Admission
    /// claims the visited slot immediately so the same URL discovered
    /// twice in one batch is queued once.
    fn enqueue(&mut self, raw: &str, frontier: &mut VecDeque<String>) -> Result<()> {
        self.report.discovered += 1;

        if self.rules.is_excluded(raw) {
            debug!(url = %raw, "excluded by rule");
            self.report.excluded += 1;
            return Ok(());
        }
        if !self.rules.classify_domain(raw).is_allowed() {
            debug!(url = %raw, "domain not allowed");
            self.report.excluded += 1;
            return Ok(());
        }
        if !self.rules.mark_visited(raw) {
            return Ok(());
        }

        if let (Some(resume), Some(run_id)) = (self.resume.as_mut(), self.run_id) {
            let key = canonicalize_url(raw).unwrap_or_else(|_| raw.to_string());
            resume.record_visited(&key, run_id)?;
            resume.record_page_state(raw, PageState::Queued, None, None, None, run_id)?;
        }

        frontier.push_back(raw.to_string());
        Ok(())
    }

    /// Folds one finished page into report, archive, resume state, and
    /// frontier
    fn absorb(&mut self, outcome: PageOutcome, frontier: &mut VecDeque<String>) -> Result<()> {
        if outcome.fetched {
            self.report.fetched += 1;
        }

        match outcome.state {
            PageState::Ingested => self.report.ingested += 1,
            PageState::NestedOnly => self.report.nested_only += 1,
            PageState::Excluded => self.report.excluded += 1,
            PageState::Failed => {
                let reason = outcome.error.as_deref().unwrap_or("unknown error");
                warn!(url = %outcome.url, error = %reason, "page failed");
                self.report.errors += 1;
            }
            _ => {}
        }

        if let Some(receipt) = &outcome.receipt {
            self.report.chunks_stored += receipt.stored as u64;
            self.report.duplicate_chunks += receipt.duplicates as u64;
        }
        if outcome.archived {
            self.report.archived_pages += 1;
        }

        if let Some(archive) = &self.archive {
            match outcome.state {
                PageState::Ingested | PageState::NestedOnly => {
                    archive.record_processed(&outcome.url)
                }
                PageState::Failed => {
                    let reason = outcome.error.as_deref().unwrap_or("unknown error");
                    archive.record_error(&outcome.url, reason);
                }
                _ => {}
            }
            if let Some(error) = &outcome.archive_error {
                archive.record_error(&outcome.url, error);
            }
        }

        if let (Some(resume), Some(run_id)) = (self.resume.as_mut(), self.run_id) {
            resume.record_page_state(
                &outcome.url,
                outcome.state,
                outcome.status_code,
                outcome.content_type.as_deref(),
                outcome.error.as_deref(),
                run_id,
            )?;
            if let Some(receipt) = &outcome.receipt {
                if !receipt.fingerprints.is_empty() {
                    resume.record_fingerprints(&receipt.fingerprints, run_id)?;
                }
            }
        }

        for link in outcome.links {
            self.enqueue(&link, frontier)?;
        }
        Ok(())
    }

    fn page_task(&self) -> PageTask {
        PageTask {
            rules: Arc::clone(&self.rules),
            robots: Arc::clone(&self.robots),
            scheduler: Arc::clone(&self.scheduler),
            fetcher: Arc::clone(&self.fetcher),
            pipeline: Arc::clone(&self.pipeline),
            chunker: Arc::clone(&self.chunker),
            gate: Arc::clone(&self.gate),
            archive: self.archive.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Everything one page needs, detached from the drive loop
#[derive(Clone)]
struct PageTask {
    rules: Arc<UrlRules>,
    robots: Arc<RobotsGate>,
    scheduler: Arc<Scheduler>,
    fetcher: Arc<Fetcher>,
    pipeline: Arc<ParserPipeline>,
    chunker: Arc<Chunker>,
    gate: Arc<IngestGate>,
    archive: Option<Arc<SessionArchive>>,
    session_id: String,
}

/// What one page task hands back to the drive loop
struct PageOutcome {
    url: String,
    state: PageState,
    status_code: Option<u16>,
    content_type: Option<String>,
    error: Option<String>,
    archive_error: Option<String>,
    links: Vec<String>,
    receipt: Option<IngestReceipt>,
    fetched: bool,
    archived: bool,
}

impl PageOutcome {
    fn base(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: PageState::Failed,
            status_code: None,
            content_type: None,
            error: None,
            archive_error: None,
            links: Vec::new(),
            receipt: None,
            fetched: false,
            archived: false,
        }
    }
}

impl PageTask {
    /// Processes one admitted URL from fetch through ingest
    ///
    /// Never returns an error: every failure becomes a `Failed` outcome so
    /// the drive loop can keep crawling. Links extracted before a failure
    /// stay in the outcome and are still followed.
    async fn process(self, url: String) -> PageOutcome {
        let mut outcome = PageOutcome::base(&url);

        let parsed = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(error) => {
                outcome.error = Some(error.to_string());
                return outcome;
            }
        };

        if !self.robots.is_allowed(&parsed).await {
            debug!(%url, "disallowed by robots.txt");
            outcome.state = PageState::Excluded;
            outcome.error = Some("disallowed by robots.txt".to_string());
            return outcome;
        }

        let response = match self.fetch_paced(&parsed).await {
            Ok(response) => response,
            Err(error) => {
                if let LexcrawlError::HttpStatus { status, .. } = &error {
                    outcome.status_code = Some(*status);
                }
                outcome.error = Some(error.to_string());
                return outcome;
            }
        };

        outcome.fetched = true;
        outcome.status_code = Some(response.status);
        outcome.content_type = Some(response.content_type.clone());

        // The redirect target counts as visited too, so a later link to
        // it is not fetched again
        if response.final_url != url {
            self.rules.mark_visited(&response.final_url);
        }

        let tier = self.rules.classify_domain(&url);
        let is_html = response.content_type.contains("html");

        if tier.follows_links() && is_html {
            if let Ok(base) = Url::parse(&response.final_url) {
                let body = String::from_utf8_lossy(&response.body);
                outcome.links = extract_links(&body, &base);
            }
        }

        if self.rules.is_nested_only(&url) {
            outcome.state = PageState::NestedOnly;
            return outcome;
        }

        let elements =
            match self
                .pipeline
                .process(&response.body, &url, Some(&response.content_type))
            {
                Ok(elements) => elements,
                Err(error) => {
                    outcome.error = Some(error.to_string());
                    return outcome;
                }
            };

        let chunks = self.chunker.chunk(&elements, &url);

        let document = (tier == DomainTier::Primary && is_html)
            .then(|| docmeta::extract(&response.body, &url));

        if let (Some(archive), Some(metadata)) = (self.archive.as_ref(), document.as_ref()) {
            let documents = self.collect_documents(&response, metadata).await;
            match archive.archive_page(metadata, &documents).await {
                Ok(_) => outcome.archived = true,
                Err(error) => outcome.archive_error = Some(error.to_string()),
            }
        }

        match self
            .gate
            .ingest(&chunks, document.as_ref(), Some(&self.session_id))
            .await
        {
            Ok(receipt) => {
                outcome.state = PageState::Ingested;
                outcome.receipt = Some(receipt);
            }
            Err(error) => {
                outcome.error = Some(error.to_string());
            }
        }

        outcome
    }

    /// Fetches under the global permit and the host's politeness slot
    async fn fetch_paced(&self, url: &Url) -> Result<FetchResponse> {
        let _permit = self.scheduler.acquire().await;
        let crawl_delay = self.robots.crawl_delay(url).await;
        self.scheduler.pace(url, crawl_delay).await;
        self.fetcher.fetch(url.as_str()).await
    }

    /// The page body plus every bottom-related document, fetched politely
    ///
    /// A related document that is disallowed or fails to fetch is skipped;
    /// the page record simply lists fewer documents.
    async fn collect_documents(
        &self,
        response: &FetchResponse,
        metadata: &DocumentMetadata,
    ) -> Vec<FetchedDocument> {
        let mut documents = vec![FetchedDocument {
            url: metadata.url.clone(),
            content_type: response.content_type.clone(),
            body: response.body.clone(),
        }];

        for related in &metadata.bottom_related {
            let Ok(parsed) = Url::parse(related) else {
                continue;
            };
            if !self.robots.is_allowed(&parsed).await {
                debug!(url = %related, "related document disallowed by robots.txt");
                continue;
            }
            match self.fetch_paced(&parsed).await {
                Ok(fetched) => documents.push(FetchedDocument {
                    url: related.clone(),
                    content_type: fetched.content_type,
                    body: fetched.body,
                }),
                Err(error) => {
                    warn!(url = %related, %error, "failed to fetch related document")
                }
            }
        }

        documents
    }
}
