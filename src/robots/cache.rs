use chrono::{DateTime, Duration, Utc};
use robotstxt::DefaultMatcher;

/// Access rules from one host's robots.txt
///
/// Matching runs against the raw content on demand; an empty or
/// unfetchable robots.txt allows everything.
#[derive(Debug, Clone)]
pub struct RobotRules {
    content: String,
    allow_all: bool,
}

impl RobotRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Crawl-delay in seconds for this agent, preferring an exact
    /// user-agent group over the wildcard group
    ///
    /// The robotstxt matcher ignores this directive, so the groups are
    /// scanned here: each `User-agent` run opens a group and a
    /// `Crawl-delay` inside it applies to those agents.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_directives = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if in_directives {
                        group.clear();
                        in_directives = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_directives = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|g| g == "*") {
                        wildcard_delay = Some(delay);
                    }
                    if group.iter().any(|g| g != "*" && agent.contains(g.as_str())) {
                        agent_delay = Some(delay);
                    }
                }
                _ => in_directives = true,
            }
        }

        agent_delay.or(wildcard_delay)
    }
}

/// Rules for one host together with their fetch time
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Entries older than 24 hours are refetched
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.rules.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.rules.crawl_delay(user_agent)
    }
}
