use std::collections::HashSet;
use std::sync::Mutex;

/// Set of canonical URLs already dispatched for fetch
///
/// Shared across concurrent page tasks, so membership check and insert are
/// a single atomic operation: two tasks racing on the same key cannot both
/// observe "not present". Grows monotonically for the lifetime of a run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key if absent; returns true if it was newly inserted
    ///
    /// A false return means some task (possibly this one, earlier) already
    /// claimed the key, and the caller must not fetch it again.
    pub fn insert(&self, key: &str) -> bool {
        let mut set = self.inner.lock().unwrap();
        set.insert(key.to_string())
    }

    /// Returns true if the key has been marked visited
    pub fn contains(&self, key: &str) -> bool {
        let set = self.inner.lock().unwrap();
        set.contains(key)
    }

    /// Seeds the set with previously visited keys (resume support)
    pub fn extend<I: IntoIterator<Item = String>>(&self, keys: I) {
        let mut set = self.inner.lock().unwrap();
        set.extend(keys);
    }

    /// Number of visited keys
    pub fn len(&self) -> usize {
        let set = self.inner.lock().unwrap();
        set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
