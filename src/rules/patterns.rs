use crate::config::RulePattern;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// One compiled rule: a pattern, optionally guarded by an `unless` carve-out
#[derive(Debug)]
struct CompiledRule {
    /// Source text, kept for logging which rule fired
    source: String,
    pattern: Regex,
    unless: Option<Regex>,
}

impl CompiledRule {
    fn matches(&self, url: &str) -> bool {
        if !self.pattern.is_match(url) {
            return false;
        }
        match &self.unless {
            Some(unless) => !unless.is_match(url),
            None => true,
        }
    }
}

/// An ordered list of compiled URL rules
///
/// Evaluation is case-insensitive against the full URL string; the first
/// matching rule wins. Compilation happens once at startup; a pattern that
/// fails to compile is a fatal configuration error.
#[derive(Debug)]
pub struct PatternSet {
    rules: Vec<CompiledRule>,
}

impl PatternSet {
    /// Compiles a pattern list from configuration
    ///
    /// # Arguments
    ///
    /// * `entries` - The configured rule patterns, in evaluation order
    ///
    /// # Returns
    ///
    /// * `Ok(PatternSet)` - All patterns compiled
    /// * `Err(ConfigError)` - A pattern failed to compile
    pub fn compile(entries: &[RulePattern]) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(entries.len());

        for entry in entries {
            let (pattern_src, unless_src) = match entry {
                RulePattern::Plain(p) => (p.as_str(), None),
                RulePattern::Guarded { pattern, unless } => (pattern.as_str(), Some(unless.as_str())),
            };

            let pattern = compile_case_insensitive(pattern_src)?;
            let unless = match unless_src {
                Some(src) => Some(compile_case_insensitive(src)?),
                None => None,
            };

            rules.push(CompiledRule {
                source: pattern_src.to_string(),
                pattern,
                unless,
            });
        }

        Ok(Self { rules })
    }

    /// Returns true if any rule matches the URL; first match wins
    pub fn matches(&self, url: &str) -> bool {
        for rule in &self.rules {
            if rule.matches(url) {
                tracing::debug!("URL {} matched rule: {}", url, rule.source);
                return true;
            }
        }
        false
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_case_insensitive(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: Vec<RulePattern>) -> PatternSet {
        PatternSet::compile(&entries).unwrap()
    }

    #[test]
    fn test_plain_pattern_matches() {
        let patterns = set(vec![RulePattern::Plain(r"/en/search".to_string())]);
        assert!(patterns.matches("https://www.cssf.lu/en/search?q=x"));
        assert!(!patterns.matches("https://www.cssf.lu/en/news"));
    }

    #[test]
    fn test_case_insensitive() {
        let patterns = set(vec![RulePattern::Plain(r"\.(zip|xls)$".to_string())]);
        assert!(patterns.matches("https://www.cssf.lu/file.ZIP"));
        assert!(patterns.matches("https://www.cssf.lu/file.Xls"));
    }

    #[test]
    fn test_first_match_wins_short_circuits() {
        let patterns = set(vec![
            RulePattern::Plain(r"^mailto:".to_string()),
            RulePattern::Plain(r"^mailto:admin".to_string()),
        ]);
        // Both rules match; evaluation stops at the first
        assert!(patterns.matches("mailto:admin@cssf.lu"));
    }

    #[test]
    fn test_guarded_pattern() {
        let patterns = set(vec![RulePattern::Guarded {
            pattern: r"^https?://eur-lex\.europa\.eu".to_string(),
            unless: r"/en/txt/\?".to_string(),
        }]);

        // Matches the domain without the English text view
        assert!(patterns.matches("https://eur-lex.europa.eu/homepage.html"));
        // The carve-out suppresses the match
        assert!(!patterns.matches(
            "https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=CELEX:32013R0575"
        ));
    }

    #[test]
    fn test_guarded_anchored_carveout() {
        let patterns = set(vec![RulePattern::Guarded {
            pattern: r"^https?://data\.europa\.eu".to_string(),
            unless: r"^https?://data\.europa\.eu/eli".to_string(),
        }]);

        assert!(patterns.matches("https://data.europa.eu/catalog"));
        assert!(!patterns.matches("https://data.europa.eu/eli/reg/2013/575/oj"));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let patterns = set(vec![]);
        assert!(!patterns.matches("https://anything.example/"));
        assert!(patterns.is_empty());
    }
}
