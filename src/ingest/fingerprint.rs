use sha2::{Digest, Sha256};

/// Stable identity of one chunk: SHA-256 over the text followed by the
/// source URL, rendered as lowercase hex
///
/// The URL is part of the identity so that boilerplate repeated across
/// pages ("Table of contents", legal footers) is stored once per page
/// rather than collapsed across the whole site.
pub fn fingerprint(text: &str, source_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(source_url.as_bytes());
    hex::encode(hasher.finalize())
}
