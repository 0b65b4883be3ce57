use crate::config::types::{
    ArchiveConfig, ChunkerConfig, Config, CrawlerConfig, PartitionerConfig, PersistenceConfig,
    RulePattern, RulesConfig, StoreConfig, UserAgentConfig,
};
use crate::ConfigError;
use regex::RegexBuilder;
use url::Url;

/// Validates the entire configuration
///
/// Runs fail-fast: the first violation aborts with a specific message,
/// before any fetch is issued.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_rules_config(&config.rules)?;
    validate_partitioner_config(&config.partitioner)?;
    validate_chunker_config(&config.chunker)?;
    validate_store_config(&config.store)?;
    validate_archive_config(&config.archive)?;
    validate_persistence_config(&config.persistence)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seed_urls.is_empty() {
        return Err(ConfigError::Validation(
            "seed-urls must contain at least one URL".to_string(),
        ));
    }

    for seed in &config.seed_urls {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use an http(s) scheme",
                seed
            )));
        }
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 64, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.politeness_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "politeness_delay_ms must be <= 60000ms, got {}ms",
            config.politeness_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_response_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_response_bytes must be >= 1024, got {}",
            config.max_response_bytes
        )));
    }

    if config.max_redirects > 10 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 10, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates that every rule pattern compiles as a case-insensitive regex
fn validate_rules_config(config: &RulesConfig) -> Result<(), ConfigError> {
    if config.primary_domains.is_empty() {
        return Err(ConfigError::Validation(
            "primary-domains must contain at least one domain".to_string(),
        ));
    }

    for domain in config
        .primary_domains
        .iter()
        .chain(config.secondary_domains.iter())
    {
        validate_domain_string(domain)?;
    }

    for entry in config
        .exclude_patterns
        .iter()
        .chain(config.nested_only_patterns.iter())
    {
        validate_rule_pattern(entry)?;
    }

    Ok(())
}

/// Validates partition-time grouping thresholds
fn validate_partitioner_config(config: &PartitionerConfig) -> Result<(), ConfigError> {
    if config.group_max_chars < 1 {
        return Err(ConfigError::Validation(
            "group_max_chars must be >= 1".to_string(),
        ));
    }

    if config.group_new_after_chars > config.group_max_chars {
        return Err(ConfigError::Validation(format!(
            "group_new_after_chars ({}) must be <= group_max_chars ({})",
            config.group_new_after_chars, config.group_max_chars
        )));
    }

    if config.group_combine_under_chars > config.group_new_after_chars {
        return Err(ConfigError::Validation(format!(
            "group_combine_under_chars ({}) must be <= group_new_after_chars ({})",
            config.group_combine_under_chars, config.group_new_after_chars
        )));
    }

    Ok(())
}

/// Validates chunker thresholds
fn validate_chunker_config(config: &ChunkerConfig) -> Result<(), ConfigError> {
    if config.max_chars < 1 {
        return Err(ConfigError::Validation(
            "chunker max_chars must be >= 1".to_string(),
        ));
    }

    if config.overlap_chars >= config.max_chars {
        return Err(ConfigError::Validation(format!(
            "overlap_chars ({}) must be smaller than max_chars ({})",
            config.overlap_chars, config.max_chars
        )));
    }

    if config.combine_under_chars >= config.max_chars {
        return Err(ConfigError::Validation(format!(
            "combine_under_chars ({}) must be smaller than max_chars ({})",
            config.combine_under_chars, config.max_chars
        )));
    }

    Ok(())
}

/// Validates store gateway configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &config.base_url {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid store base-url: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "store base-url '{}' must use an http(s) scheme",
                base_url
            )));
        }
    }

    if config.top_k < 1 {
        return Err(ConfigError::Validation("top_k must be >= 1".to_string()));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "store max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates archive configuration
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    if config.enabled && config.root.is_empty() {
        return Err(ConfigError::Validation(
            "archive root cannot be empty when archiving is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Validates persistence configuration
fn validate_persistence_config(config: &PersistenceConfig) -> Result<(), ConfigError> {
    if config.enabled && config.db_path.is_empty() {
        return Err(ConfigError::Validation(
            "db-path cannot be empty when persistence is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Compiles a rule pattern (and its `unless` carve-out, if present)
fn validate_rule_pattern(entry: &RulePattern) -> Result<(), ConfigError> {
    compile_pattern(entry.pattern())?;
    if let RulePattern::Guarded { unless, .. } = entry {
        compile_pattern(unless)?;
    }
    Ok(())
}

fn compile_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: "pattern cannot be empty".to_string(),
        });
    }

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

    Ok(())
}

/// Validates a domain string used in the tier lists
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    // Check that it doesn't start or end with a dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    // Must contain at least one dot (e.g., example.com, not just "example")
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
