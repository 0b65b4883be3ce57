//! End-to-end crawl tests
//!
//! These tests run the whole pipeline against mock HTTP servers: one
//! serving the crawled site, and where the scenario needs it, a second
//! one standing in for the vector-store gateway.

use std::sync::Arc;
use std::time::Duration;

use lexcrawl::archive::{FsObjectStore, Reprocessor};
use lexcrawl::chunk::Chunker;
use lexcrawl::config::{
    ArchiveConfig, ChunkerConfig, Config, CrawlerConfig, PartitionerConfig, PersistenceConfig,
    RulePattern, RulesConfig, StoreConfig, UserAgentConfig,
};
use lexcrawl::crawler::Coordinator;
use lexcrawl::ingest::IngestGate;
use lexcrawl::partition::ParserPipeline;
use lexcrawl::store::{HttpVectorStore, MemoryVectorStore, VectorStore};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CIRCULAR_TEXT: &str = "The Commission de Surveillance du Secteur Financier adopts this \
    circular to clarify the reporting obligations of credit institutions established in \
    Luxembourg. Institutions shall transmit the requested data within the deadlines set out \
    in the annex and shall keep supporting records available for five years.";

const LAW_TEXT: &str = "Article 1. Credit institutions within the meaning of this law are \
    undertakings whose business is to receive deposits or other repayable funds from the \
    public and to grant credits for their own account. The taking up of such business is \
    subject to a written authorisation issued by the competent minister.";

/// Test configuration: the mock server's loopback address plays the
/// primary site, `localhost` plays an affiliated legal domain
fn create_test_config(site_uri: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_urls: vec![format!("{site_uri}/")],
            max_pages: 0,
            max_items: 0,
            max_concurrent_requests: 4,
            politeness_delay_ms: 0,
            request_timeout_secs: 5,
            max_response_bytes: 10 * 1024 * 1024,
            max_redirects: 5,
            respect_robots_txt: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestIngest".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        },
        rules: RulesConfig {
            primary_domains: vec!["127.0.0.1".to_string()],
            secondary_domains: vec!["localhost".to_string()],
            exclude_patterns: vec![RulePattern::Plain("/private/".to_string())],
            nested_only_patterns: vec![RulePattern::Plain(
                r"^http://127\.0\.0\.1:\d+/$".to_string(),
            )],
        },
        partitioner: PartitionerConfig::default(),
        chunker: ChunkerConfig::default(),
        store: StoreConfig::default(),
        archive: ArchiveConfig::default(),
        persistence: PersistenceConfig::default(),
    }
}

fn listing_page(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<p><a href="{href}">{href}</a></p>"#))
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

fn content_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body>\
         <div class=\"content-section\"><h2>{title}</h2><p>{body}</p></div>\
         </body></html>"
    )
}

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_ingests_through_store_gateway() {
    let site = MockServer::start().await;
    mount_page(&site, "/", listing_page(&["/en/circular/"])).await;
    mount_page(
        &site,
        "/en/circular/",
        content_page("Circular CSSF 24/860", CIRCULAR_TEXT),
    )
    .await;

    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "ids": ["chunk-0"],
        })))
        .expect(1..)
        .mount(&gateway)
        .await;

    let mut config = create_test_config(&site.uri());
    config.store.base_url = Some(gateway.uri());

    let store = Arc::new(
        HttpVectorStore::from_config(&config.store, Duration::from_secs(5)).unwrap(),
    );
    store.health_check().await.unwrap();

    let mut coordinator = Coordinator::new(config, store, None, false).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.nested_only, 1);
    assert_eq!(report.ingested, 1);
    assert_eq!(report.errors, 0);
    assert!(report.chunks_stored >= 1);

    // The gateway saw the chunk text and its metadata record
    let requests = gateway.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/documents")
        .expect("no documents request");
    let body: serde_json::Value = serde_json::from_slice(&upload.body).unwrap();

    let texts = body["texts"].as_array().unwrap();
    assert!(texts
        .iter()
        .any(|t| t.as_str().unwrap().contains("reporting obligations")));

    let metadata = &body["metadatas"][0];
    assert!(metadata["url"].as_str().unwrap().ends_with("/en/circular/"));
    assert_eq!(
        metadata["crawl_session"].as_str().unwrap(),
        coordinator.session_id()
    );
}

#[tokio::test]
async fn test_secondary_domain_fetched_but_not_followed() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    // The listing on the primary host points at an affiliated legal
    // domain; `localhost` resolves back to the same mock server
    mount_page(
        &server,
        "/",
        listing_page(&[&format!("http://localhost:{port}/en/law/")]),
    )
    .await;
    mount_page(
        &server,
        "/en/law/",
        format!(
            "<html><body><h1>Law of 5 April 1993</h1><p>{LAW_TEXT}</p>\
             <a href=\"/en/law/next/\">next</a></body></html>"
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/en/law/next/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryVectorStore::new());
    let mut coordinator =
        Coordinator::new(create_test_config(&server.uri()), store.clone(), None, false).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.nested_only, 1);
    assert_eq!(report.ingested, 1);

    let texts = store.texts();
    assert!(texts.iter().any(|t| t.contains("repayable funds")));
}

#[tokio::test]
async fn test_archived_session_replays_into_fresh_store() {
    let server = MockServer::start().await;
    mount_page(&server, "/", listing_page(&["/en/circular/"])).await;
    mount_page(
        &server,
        "/en/circular/",
        content_page("Circular CSSF 24/860", CIRCULAR_TEXT),
    )
    .await;

    let dir = tempdir().unwrap();
    let mut config = create_test_config(&server.uri());
    config.archive.enabled = true;
    config.archive.root = dir.path().to_string_lossy().into_owned();

    let crawl_store = Arc::new(MemoryVectorStore::new());
    let mut coordinator =
        Coordinator::new(config.clone(), crawl_store.clone(), None, false).unwrap();
    let report = coordinator.run().await.unwrap();
    assert_eq!(report.archived_pages, 1);

    // Replay the archived session into a fresh store without touching
    // the network
    drop(server);

    let replay_store = Arc::new(MemoryVectorStore::new());
    let reprocessor = Reprocessor::new(
        Arc::new(FsObjectStore::new(config.archive.root.clone())),
        Arc::new(ParserPipeline::from_config(&config)),
        Arc::new(Chunker::new(&config.chunker)),
        Arc::new(IngestGate::new(replay_store.clone())),
    );

    let sessions = reprocessor.list_sessions().await.unwrap();
    assert_eq!(sessions, vec![coordinator.session_id().to_string()]);

    let summary = reprocessor.reprocess(None).await.unwrap();
    assert_eq!(summary.session_id, coordinator.session_id());
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 0);
    assert!(summary.stored >= 1);

    // The replayed chunks match what the live crawl stored
    let crawled = crawl_store.texts();
    let replayed = replay_store.texts();
    assert_eq!(crawled, replayed);
}
