use std::collections::HashSet;
use std::sync::Mutex;

/// Fingerprints of every chunk already admitted to the store
///
/// Admission tests and records under a single lock acquisition, so two
/// page tasks carrying the same chunk cannot both see it as new.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every fingerprint not yet present and returns the indices
    /// of the newly admitted ones, in input order
    ///
    /// A fingerprint repeated within the batch is admitted once.
    pub fn admit(&self, fingerprints: &[String]) -> Vec<usize> {
        let mut inner = self.inner.lock().unwrap();
        let mut fresh = Vec::new();
        for (index, fingerprint) in fingerprints.iter().enumerate() {
            if inner.insert(fingerprint.clone()) {
                fresh.push(index);
            }
        }
        fresh
    }

    /// Seeds the set from persisted fingerprints when resuming a run
    pub fn restore<I>(&self, fingerprints: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.extend(fingerprints);
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.inner.lock().unwrap().contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
