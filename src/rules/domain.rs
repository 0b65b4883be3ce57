use std::fmt;
use url::Url;

/// Domain tier of a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainTier {
    /// The site under active, recursive ingestion
    Primary,
    /// A cross-referenced legal source: fetched for content, links not followed
    Secondary,
    /// Anything else: never fetched
    Unknown,
}

impl DomainTier {
    /// Returns true if URLs on this tier may be fetched at all
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Primary | Self::Secondary)
    }

    /// Returns true if outbound links from this tier's pages are followed
    pub fn follows_links(&self) -> bool {
        matches!(self, Self::Primary)
    }

    /// Stable string form used in chunk metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DomainTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extracts the lowercased host from a URL, with any `www.` prefix removed
///
/// # Arguments
///
/// * `url_str` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The host, lowercased, without `www.`
/// * `None` - The URL is malformed or has no host
pub fn extract_host(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let host = url.host_str()?.to_lowercase();

    Some(match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}

/// Checks whether a host belongs to a registered domain
///
/// Matches the domain itself and any subdomain of it: `cssf.lu` matches
/// `cssf.lu` and `edesk.apps.cssf.lu`, but not `notcssf.lu`.
pub fn host_in_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(
            extract_host("https://www.cssf.lu/en/page"),
            Some("cssf.lu".to_string())
        );
        assert_eq!(
            extract_host("https://EUR-LEX.EUROPA.EU/legal"),
            Some("eur-lex.europa.eu".to_string())
        );
        assert_eq!(extract_host("not a url"), None);
    }

    #[test]
    fn test_host_in_domain_exact() {
        assert!(host_in_domain("cssf.lu", "cssf.lu"));
    }

    #[test]
    fn test_host_in_domain_subdomain() {
        assert!(host_in_domain("edesk.apps.cssf.lu", "cssf.lu"));
        assert!(host_in_domain("careers.cssf.lu", "cssf.lu"));
    }

    #[test]
    fn test_host_in_domain_rejects_suffix_lookalike() {
        assert!(!host_in_domain("notcssf.lu", "cssf.lu"));
        assert!(!host_in_domain("cssf.lu.evil.com", "cssf.lu"));
    }

    #[test]
    fn test_tier_predicates() {
        assert!(DomainTier::Primary.is_allowed());
        assert!(DomainTier::Secondary.is_allowed());
        assert!(!DomainTier::Unknown.is_allowed());

        assert!(DomainTier::Primary.follows_links());
        assert!(!DomainTier::Secondary.follows_links());
        assert!(!DomainTier::Unknown.follows_links());
    }
}
