//! lexcrawl entry point
//!
//! Command-line interface for the regulatory-publication crawler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lexcrawl::archive::{FsObjectStore, ObjectStore, Reprocessor, StatusReport};
use lexcrawl::chunk::Chunker;
use lexcrawl::config::{load_config_with_hash, Config};
use lexcrawl::crawler::Coordinator;
use lexcrawl::ingest::IngestGate;
use lexcrawl::partition::ParserPipeline;
use lexcrawl::storage::ResumeStore;
use lexcrawl::store::{HttpVectorStore, MemoryVectorStore, VectorStore};
use lexcrawl::UrlRules;

/// lexcrawl: a crawler and ingest pipeline for regulatory publications
///
/// Crawls the configured publication site and affiliated legal sources,
/// partitions each page into content chunks, and loads them into a
/// vector store through its HTTP gateway. Fetched pages can be archived
/// per session and replayed later without recrawling.
#[derive(Parser, Debug)]
#[command(name = "lexcrawl")]
#[command(version = "1.0.0")]
#[command(about = "Crawls regulatory publications into a vector store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured sites and ingest their content
    Crawl {
        /// Start clean, ignoring persisted crawl state (the default)
        #[arg(long, conflicts_with = "resume")]
        fresh: bool,

        /// Restore visited URLs and chunk fingerprints from the resume
        /// database before crawling
        #[arg(long, conflicts_with = "fresh")]
        resume: bool,

        /// Run the full pipeline against an in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Replay an archived session through partition, chunk, and ingest
    Reprocess {
        /// Session id to replay (latest when omitted)
        session: Option<String>,

        /// Run the pipeline against an in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Query the vector store
    Search {
        /// Query text
        query: String,

        /// Number of results to return
        #[arg(long, value_name = "N")]
        top_k: Option<usize>,
    },

    /// List archived sessions
    Sessions,

    /// Validate the configuration and show the crawl plan
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Crawl {
            resume, dry_run, ..
        } => handle_crawl(config, config_hash, resume, dry_run).await,
        Command::Reprocess { session, dry_run } => {
            handle_reprocess(config, session.as_deref(), dry_run).await
        }
        Command::Search { query, top_k } => handle_search(config, &query, top_k).await,
        Command::Sessions => handle_sessions(config).await,
        Command::Validate => handle_validate(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lexcrawl=info,warn"),
            1 => EnvFilter::new("lexcrawl=debug,info"),
            2 => EnvFilter::new("lexcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the vector store gateway, or an in-memory stand-in for dry runs
fn build_store(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn VectorStore>> {
    if dry_run {
        tracing::info!("Dry run: chunks go to an in-memory store");
        return Ok(Arc::new(MemoryVectorStore::new()));
    }
    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
    let store = HttpVectorStore::from_config(&config.store, timeout)
        .context("failed to build vector store client")?;
    Ok(Arc::new(store))
}

/// Handles the crawl subcommand
async fn handle_crawl(
    config: Config,
    config_hash: String,
    resume: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let store = build_store(&config, dry_run)?;

    if config.store.health_check_on_start && !dry_run {
        store
            .health_check()
            .await
            .context("vector store health check failed")?;
        tracing::info!("Vector store is healthy");
    }

    let resume_store = if config.persistence.enabled {
        Some(ResumeStore::open(&PathBuf::from(&config.persistence.db_path))?)
    } else {
        if resume {
            anyhow::bail!("--resume requires persistence to be enabled in the configuration");
        }
        None
    };

    if resume {
        tracing::info!("Resuming: previously visited URLs will not be refetched");
    } else {
        tracing::info!("Starting fresh crawl");
    }

    let started = Instant::now();
    let mut coordinator = Coordinator::new(config, store, resume_store, resume)?;
    coordinator.set_config_hash(&config_hash);
    let report = coordinator.run().await?;

    report.print_summary(started.elapsed());
    Ok(())
}

/// Handles the reprocess subcommand
async fn handle_reprocess(
    config: Config,
    session: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let store = build_store(&config, dry_run)?;
    let objects = Arc::new(FsObjectStore::new(config.archive.root.clone()));

    let reprocessor = Reprocessor::new(
        objects,
        Arc::new(ParserPipeline::from_config(&config)),
        Arc::new(Chunker::new(&config.chunker)),
        Arc::new(IngestGate::new(store)),
    );

    let summary = reprocessor.reprocess(session).await?;
    println!(
        "Reprocessed session {}: {} pages, {} chunks stored, {} errors ({:.1}s, {:.2} docs/s)",
        summary.session_id,
        summary.processed,
        summary.stored,
        summary.errors,
        summary.elapsed_seconds,
        summary.docs_per_second
    );
    Ok(())
}

/// Handles the search subcommand
async fn handle_search(config: Config, query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    let store = build_store(&config, false)?;
    let top_k = top_k.unwrap_or(config.store.top_k);

    let hits = store.similarity_search(query, top_k).await?;
    if hits.is_empty() {
        println!("No results");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        let source = hit
            .metadata
            .get("url")
            .and_then(|value| value.as_str())
            .unwrap_or("unknown source");
        println!("{}. [{:.3}] {}", rank + 1, hit.score, source);
        println!("   {}", preview(&hit.content, 240));
    }
    Ok(())
}

/// Handles the sessions subcommand
async fn handle_sessions(config: Config) -> anyhow::Result<()> {
    let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(config.archive.root.clone()));

    let keys = objects.list("").await?;
    let mut sessions: Vec<String> = keys
        .iter()
        .filter_map(|key| key.split_once('/').map(|(session, _)| session.to_string()))
        .collect();
    sessions.sort();
    sessions.dedup();
    sessions.reverse();

    if sessions.is_empty() {
        println!("No archived sessions under {}", config.archive.root);
        return Ok(());
    }

    for session in &sessions {
        let key = format!("{session}/status_report.json");
        match objects.get(&key).await {
            Ok(body) => {
                let report: StatusReport = serde_json::from_slice(&body)?;
                let finished = match report.end_time {
                    Some(_) => "",
                    None => "  (unfinished)",
                };
                println!(
                    "{}  {} pages, {} errors{}",
                    session,
                    report.processed.len(),
                    report.errors.len(),
                    finished
                );
            }
            Err(_) => println!("{session}  (no status report)"),
        }
    }
    Ok(())
}

/// Handles the validate subcommand
fn handle_validate(config: &Config) -> anyhow::Result<()> {
    // Compiles every rule pattern, so a bad regex fails here and not
    // mid-crawl
    UrlRules::new(&config.rules)?;

    println!("=== Crawl Plan ===\n");

    println!("Seed URLs ({}):", config.crawler.seed_urls.len());
    for seed in &config.crawler.seed_urls {
        println!("  * {}", seed);
    }

    println!("\nCrawler:");
    println!("  Max pages: {}", bound_label(config.crawler.max_pages));
    println!("  Max items: {}", bound_label(config.crawler.max_items));
    println!(
        "  Concurrency: {}",
        config.crawler.max_concurrent_requests
    );
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_ms
    );
    println!(
        "  Respect robots.txt: {}",
        config.crawler.respect_robots_txt
    );

    println!("\nUser Agent:");
    println!(
        "  {}/{} (+{}; {})",
        config.user_agent.crawler_name,
        config.user_agent.crawler_version,
        config.user_agent.contact_url,
        config.user_agent.contact_email
    );

    println!("\nRules:");
    println!("  Primary domains: {}", config.rules.primary_domains.join(", "));
    println!(
        "  Secondary domains: {}",
        config.rules.secondary_domains.join(", ")
    );
    println!(
        "  Exclusion patterns: {}",
        config.rules.exclude_patterns.len()
    );
    println!(
        "  Nested-only patterns: {}",
        config.rules.nested_only_patterns.len()
    );

    println!("\nStore:");
    match &config.store.base_url {
        Some(url) => println!("  Base URL: {}", url),
        None => println!("  Base URL: (not set; only --dry-run will work)"),
    }
    println!("  Top-k: {}", config.store.top_k);

    println!(
        "\nArchive: {}",
        if config.archive.enabled {
            config.archive.root.as_str()
        } else {
            "disabled"
        }
    );
    println!(
        "Persistence: {}",
        if config.persistence.enabled {
            config.persistence.db_path.as_str()
        } else {
            "disabled"
        }
    );

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn bound_label(value: u64) -> String {
    if value == 0 {
        "unbounded".to_string()
    } else {
        value.to_string()
    }
}

/// One-line whitespace-collapsed preview of a chunk
fn preview(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        collapsed
    } else {
        let cut: String = collapsed.chars().take(limit).collect();
        format!("{cut}...")
    }
}
