//! URL governance rules
//!
//! This module decides, for any discovered URL, whether it should be fetched
//! at all, whether it is a "nested-only" listing page (links followed, body
//! not ingested), and which domain tier it belongs to. It also owns the
//! visited set keyed by canonical URL.
//!
//! The crawl graph here is effectively infinite (calendar pages, search
//! permutations, multi-language mirrors), so pruning is a deny-list plus a
//! domain allow-list evaluated eagerly before a fetch is ever issued.

mod canonical;
mod domain;
mod patterns;
mod visited;

pub use canonical::canonicalize_url;
pub use domain::{extract_host, host_in_domain, DomainTier};
pub use patterns::PatternSet;
pub use visited::VisitedSet;

use crate::config::RulesConfig;
use crate::ConfigError;

/// The URL rules engine
///
/// Pattern lists and domain tiers are compiled once at construction and are
/// read-only afterwards; the visited set is the engine's only mutable state
/// and is safe to share across tasks behind an `Arc`.
#[derive(Debug)]
pub struct UrlRules {
    primary_domains: Vec<String>,
    secondary_domains: Vec<String>,
    exclusions: PatternSet,
    nested_only: PatternSet,
    visited: VisitedSet,
}

impl UrlRules {
    /// Builds the engine from configuration, compiling all patterns
    ///
    /// # Arguments
    ///
    /// * `config` - The rules section of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(UrlRules)` - Engine with all patterns compiled
    /// * `Err(ConfigError)` - A pattern failed to compile
    pub fn new(config: &RulesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            primary_domains: config.primary_domains.clone(),
            secondary_domains: config.secondary_domains.clone(),
            exclusions: PatternSet::compile(&config.exclude_patterns)?,
            nested_only: PatternSet::compile(&config.nested_only_patterns)?,
            visited: VisitedSet::new(),
        })
    }

    /// Classifies a URL's domain tier
    ///
    /// Primary domains are crawled recursively; secondary domains are
    /// fetched once for content; unknown domains are never fetched. A URL
    /// that does not parse is Unknown.
    pub fn classify_domain(&self, url: &str) -> DomainTier {
        let host = match extract_host(url) {
            Some(h) => h,
            None => return DomainTier::Unknown,
        };

        if self
            .primary_domains
            .iter()
            .any(|d| host_in_domain(&host, d))
        {
            return DomainTier::Primary;
        }

        if self
            .secondary_domains
            .iter()
            .any(|d| host_in_domain(&host, d))
        {
            return DomainTier::Secondary;
        }

        DomainTier::Unknown
    }

    /// Returns true if the URL matches any exclusion rule
    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclusions.matches(url)
    }

    /// Returns true if the URL is a listing/index page
    ///
    /// Nested-only pages are crawled for link discovery but their body is
    /// not ingested. Exclusion takes precedence: callers check
    /// `is_excluded` first (an excluded listing page is neither ingested
    /// nor followed).
    pub fn is_nested_only(&self, url: &str) -> bool {
        self.nested_only.matches(url)
    }

    /// Composite fetch decision for a discovered URL
    ///
    /// True when the URL is not excluded, has not been visited, and sits on
    /// an allowed domain tier. A URL failing any condition is dropped
    /// silently by the caller.
    pub fn should_follow(&self, url: &str) -> bool {
        if self.is_excluded(url) {
            return false;
        }
        if self.is_visited(url) {
            return false;
        }
        if !self.classify_domain(url).is_allowed() {
            return false;
        }
        true
    }

    /// Marks a URL visited; returns true if it was not visited before
    ///
    /// Check and insert are one atomic operation so that two tasks racing
    /// on the same canonical URL cannot both claim it.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(&visited_key(url))
    }

    /// Returns true if the URL's canonical form has been marked visited
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&visited_key(url))
    }

    /// Seeds the visited set from persisted state (resume support)
    pub fn restore_visited<I: IntoIterator<Item = String>>(&self, keys: I) {
        self.visited.extend(keys);
    }

    /// Number of URLs marked visited so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Visited-set key for a URL
///
/// Unparseable URLs fall back to the raw string; they can never be fetched,
/// but keeping a stable key means re-discoveries are still deduplicated.
fn visited_key(url: &str) -> String {
    canonicalize_url(url).unwrap_or_else(|_| url.to_string())
}
