use serde::Deserialize;

/// Main configuration structure for Lexcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub partitioner: PartitionerConfig,
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs the crawl starts from
    #[serde(rename = "seed-urls")]
    pub seed_urls: Vec<String>,

    /// Maximum number of pages to fetch (0 = unbounded)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,

    /// Maximum number of chunks to store (0 = unbounded)
    #[serde(rename = "max-items", default)]
    pub max_items: u64,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Response body size cap (bytes)
    #[serde(rename = "max-response-bytes", default = "default_max_response_bytes")]
    pub max_response_bytes: u64,

    /// Maximum redirect hops the client will follow
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to fetch and honor robots.txt
    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// An exclusion or nested-only rule pattern
///
/// Most rules are a single regex. A few need a carve-out that regex
/// lookahead would normally express (the `regex` crate has none), so a rule
/// may pair its pattern with an `unless` regex: the rule matches when
/// `pattern` matches and `unless` does not.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RulePattern {
    Plain(String),
    Guarded { pattern: String, unless: String },
}

impl RulePattern {
    pub fn pattern(&self) -> &str {
        match self {
            Self::Plain(p) => p,
            Self::Guarded { pattern, .. } => pattern,
        }
    }
}

/// URL governance rules: domain tiers, exclusions, nested-only pages
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Domains under active, recursive ingestion
    #[serde(rename = "primary-domains", default = "default_primary_domains")]
    pub primary_domains: Vec<String>,

    /// Cross-referenced domains fetched once but not recursively crawled
    #[serde(rename = "secondary-domains", default = "default_secondary_domains")]
    pub secondary_domains: Vec<String>,

    /// Ordered exclusion patterns, matched case-insensitively; first match wins
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<RulePattern>,

    /// Listing/index pages: links are followed but the body is not ingested
    #[serde(rename = "nested-only-patterns", default = "default_nested_only_patterns")]
    pub nested_only_patterns: Vec<RulePattern>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            primary_domains: default_primary_domains(),
            secondary_domains: default_secondary_domains(),
            exclude_patterns: default_exclude_patterns(),
            nested_only_patterns: default_nested_only_patterns(),
        }
    }
}

/// Element grouping thresholds applied at partition time
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionerConfig {
    /// Hard character budget per grouped element
    #[serde(rename = "group-max-chars", default = "default_group_max_chars")]
    pub group_max_chars: usize,

    /// Start a new group at the next boundary once this size is reached
    #[serde(rename = "group-new-after-chars", default = "default_group_new_after_chars")]
    pub group_new_after_chars: usize,

    /// Sections smaller than this merge into their neighbor
    #[serde(
        rename = "group-combine-under-chars",
        default = "default_group_combine_under_chars"
    )]
    pub group_combine_under_chars: usize,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            group_max_chars: default_group_max_chars(),
            group_new_after_chars: default_group_new_after_chars(),
            group_combine_under_chars: default_group_combine_under_chars(),
        }
    }
}

/// Final chunking thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkerConfig {
    /// Hard maximum characters per stored chunk
    #[serde(rename = "max-chars", default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Title sections smaller than this merge into their neighbor
    #[serde(rename = "combine-under-chars", default = "default_chunk_combine_under")]
    pub combine_under_chars: usize,

    /// Overlap carried between consecutive fallback sub-chunks
    #[serde(rename = "overlap-chars", default = "default_chunk_overlap")]
    pub overlap_chars: usize,
}

impl ChunkerConfig {
    /// Size at which grouping starts looking for a section break (80% of max)
    pub fn new_after_chars(&self) -> usize {
        self.max_chars * 4 / 5
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            combine_under_chars: default_chunk_combine_under(),
            overlap_chars: default_chunk_overlap(),
        }
    }
}

/// Embed/store gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the embed/store gateway; required unless running --dry-run
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Default result count for similarity search
    #[serde(rename = "top-k", default = "default_top_k")]
    pub top_k: usize,

    /// Retry attempts for transient gateway failures
    #[serde(rename = "max-retries", default = "default_store_retries")]
    pub max_retries: u32,

    /// Probe the gateway health endpoint before crawling
    #[serde(rename = "health-check-on-start", default = "default_true")]
    pub health_check_on_start: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            top_k: default_top_k(),
            max_retries: default_store_retries(),
            health_check_on_start: true,
        }
    }
}

/// Session archive configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Whether to archive page metadata and referenced documents
    #[serde(default)]
    pub enabled: bool,

    /// Root directory of the filesystem object store
    #[serde(default = "default_archive_root")]
    pub root: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            root: default_archive_root(),
        }
    }
}

/// Resume persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Whether to mirror visited URLs and fingerprints to SQLite
    #[serde(default)]
    pub enabled: bool,

    /// Path to the SQLite database file
    #[serde(rename = "db-path", default = "default_db_path")]
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            db_path: default_db_path(),
        }
    }
}

fn default_max_concurrent() -> u32 {
    8
}

fn default_politeness_delay() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_response_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_redirects() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_group_max_chars() -> usize {
    1500
}

fn default_group_new_after_chars() -> usize {
    1200
}

fn default_group_combine_under_chars() -> usize {
    300
}

fn default_chunk_max_chars() -> usize {
    1800
}

fn default_chunk_combine_under() -> usize {
    200
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_store_retries() -> u32 {
    3
}

fn default_archive_root() -> String {
    "./archive".to_string()
}

fn default_db_path() -> String {
    "./lexcrawl.db".to_string()
}

fn default_primary_domains() -> Vec<String> {
    vec!["cssf.lu".to_string()]
}

fn default_secondary_domains() -> Vec<String> {
    vec![
        "eur-lex.europa.eu".to_string(),
        "data.europa.eu".to_string(),
        "data.legilux.public.lu".to_string(),
    ]
}

fn plain(p: &str) -> RulePattern {
    RulePattern::Plain(p.to_string())
}

fn guarded(pattern: &str, unless: &str) -> RulePattern {
    RulePattern::Guarded {
        pattern: pattern.to_string(),
        unless: unless.to_string(),
    }
}

/// The production exclusion rule set for the regulatory site and its
/// affiliated legal-reference domains. Order matters: first match wins.
fn default_exclude_patterns() -> Vec<RulePattern> {
    vec![
        plain(r"^https://www\.cssf\.lu/en/search"),
        plain(r"^https://www\.cssf\.lu/en/warnings"),
        plain(r"^https://www\.cssf\.lu/wp-content/uploads/annuaire_et_adresses_electroniques_specifiques"),
        plain(r"^https://www\.cssf\.lu/en/\d{4}/\d{2}/development-of-the-balance-sheet"),
        plain(r"^https://careers\.cssf\.lu"),
        plain(r"^tel:"),
        plain(r"^mailto:"),
        plain(r"^javascript:"),
        plain(r"\.(zip|xls|xlsx|doc|docx)$"),
        plain(r"/(bg|es|cs|da|de|et|el|fr|ga|hr|it|lv|lt|hu|mt|nl|pl|pt|ro|sk|sl|fi|sv)/"),
        guarded(r"^https?://eur-lex\.europa\.eu", r"/en/txt/\?"),
        plain(r"^https?://eur-lex\.europa\.eu/search\.html"),
        guarded(r"^https?://data\.europa\.eu", r"^https?://data\.europa\.eu/eli"),
        guarded(
            r"^https://data\.legilux\.public\.lu",
            r"^https://data\.legilux\.public\.lu/eli",
        ),
        plain(r"^https://edesk\.apps\.cssf\.lu"),
    ]
}

/// Index/listing pages on the primary site: followed for links, not ingested.
fn default_nested_only_patterns() -> Vec<RulePattern> {
    vec![
        plain(r"^https://www\.cssf\.lu/en/document"),
        plain(r"^https://www\.cssf\.lu/en/publication-data/"),
        plain(r"^https://www\.cssf\.lu/en/regulatory-framework/"),
        plain(r"^https://www\.cssf\.lu/en/?$"),
    ]
}
