//! Request scheduling
//!
//! Two limits apply to every outbound request: a global semaphore caps
//! how many fetches run at once, and a per-host pacer spaces consecutive
//! requests to the same host. A task acquires its permit first and holds
//! it through the pacing wait, so a host's delay also counts against the
//! global concurrency budget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::CrawlerConfig;

/// Per-host pacing based on reserved time slots
///
/// Each waiting task reserves the next free slot for its host under a
/// short lock, then sleeps until that slot outside the lock. Concurrent
/// requests to one host therefore line up `delay` apart instead of all
/// firing when the first wait expires.
struct HostPacer {
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    fn new() -> Self {
        Self {
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    async fn wait(&self, host: &str, delay: Duration) {
        let slot = {
            let mut slots = self.next_slot.lock().unwrap();
            let now = Instant::now();
            let entry = slots.entry(host.to_string()).or_insert(now);
            let scheduled = (*entry).max(now);
            *entry = scheduled + delay;
            scheduled
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(slot)).await;
    }
}

/// Bounds concurrency and enforces politeness delays
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    pacer: HostPacer,
    politeness_delay: Duration,
}

impl Scheduler {
    pub fn new(config: &CrawlerConfig) -> Self {
        let permits = config.max_concurrent_requests.max(1) as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            pacer: HostPacer::new(),
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
        }
    }

    /// Acquires a global concurrency permit
    ///
    /// Returns `None` only if the semaphore is closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Waits until the URL's host may be contacted again
    ///
    /// A robots.txt crawl-delay extends the configured politeness delay
    /// but never shortens it.
    pub async fn pace(&self, url: &Url, crawl_delay: Option<Duration>) {
        let Some(host) = url.host_str() else {
            return;
        };
        let delay = crawl_delay
            .unwrap_or(Duration::ZERO)
            .max(self.politeness_delay);
        self.pacer.wait(host, delay).await;
    }
}
