//! Robots.txt gate
//!
//! Fetches each host's robots.txt once, caches the parsed rules for 24
//! hours, and answers allow/deny for candidate URLs. A robots.txt that
//! cannot be fetched, for any reason, allows everything: the exclusion
//! rules and domain tiers remain the real crawl boundary.

mod cache;

pub use cache::{CachedRobots, RobotRules};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

/// Per-host robots.txt cache with a config kill switch
pub struct RobotsGate {
    enabled: bool,
    user_agent: String,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsGate {
    pub fn new(client: reqwest::Client, user_agent: String, enabled: bool) -> Self {
        Self {
            enabled,
            user_agent,
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The agent token matched against robots.txt groups is the bare
    /// crawler name, not the full User-Agent header
    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            client,
            config.user_agent.crawler_name.clone(),
            config.crawler.respect_robots_txt,
        )
    }

    /// Whether robots.txt permits fetching this URL
    pub async fn is_allowed(&self, url: &Url) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(host) = url.host_str() else {
            return true;
        };
        let rules = self.rules_for(url, host).await;
        rules.is_allowed(url.as_str(), &self.user_agent)
    }

    /// Host crawl-delay requested via robots.txt, if any
    pub async fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let host = url.host_str()?;
        let rules = self.rules_for(url, host).await;
        rules
            .crawl_delay(&self.user_agent)
            .map(Duration::from_secs_f64)
    }

    /// Cached rules for the URL's host, fetching on miss or staleness
    ///
    /// The lock is never held across the fetch, so two tasks missing the
    /// same host at once may both fetch it; the second write wins.
    async fn rules_for(&self, url: &Url, host: &str) -> CachedRobots {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.get(host) {
                if !cached.is_stale() {
                    return cached.clone();
                }
            }
        }

        let fetched = CachedRobots::new(self.fetch_rules(url, host).await);
        self.cache
            .lock()
            .unwrap()
            .insert(host.to_string(), fetched.clone());
        fetched
    }

    async fn fetch_rules(&self, url: &Url, host: &str) -> RobotRules {
        let Ok(robots_url) = url.join("/robots.txt") else {
            return RobotRules::allow_all();
        };

        match self.client.get(robots_url.as_str()).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(content) => {
                    debug!(host, bytes = content.len(), "fetched robots.txt");
                    RobotRules::from_content(&content)
                }
                Err(error) => {
                    warn!(host, %error, "failed to read robots.txt body");
                    RobotRules::allow_all()
                }
            },
            Ok(response) => {
                debug!(host, status = response.status().as_u16(), "no robots.txt");
                RobotRules::allow_all()
            }
            Err(error) => {
                warn!(host, %error, "failed to fetch robots.txt");
                RobotRules::allow_all()
            }
        }
    }
}
