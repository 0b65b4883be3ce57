use crate::UrlError;
use url::Url;

/// Canonicalizes a URL into the form used as a visited-set key
///
/// Two URLs that differ only in ways that cannot change the fetched
/// resource (fragment, trailing slash, host case, `www.` prefix, duplicate
/// slashes, query parameter order) collapse to the same canonical string.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-http(s) schemes
/// 3. Lowercase the host and strip a leading `www.`
/// 4. Normalize the path:
///    - Remove dot segments (. and ..)
///    - Collapse duplicate slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove the fragment
/// 6. Sort query parameters alphabetically; drop an empty query entirely
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(String)` - Canonical form
/// * `Err(UrlError)` - Failed to parse or canonicalize the URL
///
/// # Examples
///
/// ```
/// use lexcrawl::rules::canonicalize_url;
///
/// let url = canonicalize_url("https://WWW.CSSF.LU/en/page/#top").unwrap();
/// assert_eq!(url, "https://cssf.lu/en/page");
/// ```
pub fn canonicalize_url(url_str: &str) -> Result<String, UrlError> {
    // Step 1: Parse the URL
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 3: Lowercase the host and remove www. prefix
    if let Some(host) = url.host_str() {
        let mut canonical_host = host.to_lowercase();

        if canonical_host.starts_with("www.") {
            canonical_host = canonical_host[4..].to_string();
        }

        url.set_host(Some(&canonical_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingHost);
    }

    // Step 4: Normalize path
    let path = url.path();
    let canonical_path = canonicalize_path(path);
    url.set_path(&canonical_path);

    // Step 5: Remove fragment
    url.set_fragment(None);

    // Step 6: Sort query parameters, drop empty query
    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url.to_string())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn canonicalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    // Split path into segments and normalize
    let segments: Vec<&str> = path.split('/').collect();
    let mut canonical_segments: Vec<&str> = Vec::new();

    for segment in segments {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            // Parent directory - pop the last segment if possible
            ".." => {
                if !canonical_segments.is_empty() {
                    canonical_segments.pop();
                }
            }
            // Regular segment
            _ => canonical_segments.push(segment),
        }
    }

    // Reconstruct path
    if canonical_segments.is_empty() {
        return "/".to_string();
    }

    let result = format!("/{}", canonical_segments.join("/"));

    // Remove trailing slash unless it's the root
    if result.len() > 1 && result.ends_with('/') {
        result[..result.len() - 1].to_string()
    } else {
        result
    }
}
