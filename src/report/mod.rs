//! Run accounting
//!
//! The coordinator's drive loop owns one `RunReport` and bumps its
//! counters as page outcomes arrive; the summary is printed once at the
//! end of the run.

use std::time::Duration;

/// Counters for one crawl run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Links and seeds that reached the URL rules
    pub discovered: u64,
    /// URLs rejected by exclusion rules or domain tiers
    pub excluded: u64,
    /// Pages fetched successfully
    pub fetched: u64,
    /// Pages whose chunks went through the ingest gate
    pub ingested: u64,
    /// Listing pages followed for links but not ingested
    pub nested_only: u64,
    /// Chunks the vector store confirmed
    pub chunks_stored: u64,
    /// Chunks dropped as duplicates
    pub duplicate_chunks: u64,
    /// Pages archived with their documents
    pub archived_pages: u64,
    /// Pages that failed to fetch or process
    pub errors: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that finished, successfully or not
    pub fn pages_finished(&self) -> u64 {
        self.fetched + self.errors
    }

    pub fn print_summary(&self, elapsed: Duration) {
        println!("=== Crawl Summary ===");
        println!("  Discovered URLs:   {}", self.discovered);
        println!("  Excluded by rules: {}", self.excluded);
        println!("  Pages fetched:     {}", self.fetched);
        println!("  Pages ingested:    {}", self.ingested);
        println!("  Listing pages:     {}", self.nested_only);
        println!("  Chunks stored:     {}", self.chunks_stored);
        println!("  Duplicate chunks:  {}", self.duplicate_chunks);
        if self.archived_pages > 0 {
            println!("  Pages archived:    {}", self.archived_pages);
        }
        println!("  Errors:            {}", self.errors);

        let seconds = elapsed.as_secs_f64();
        if seconds > 0.0 && self.fetched > 0 {
            println!(
                "  Elapsed: {:.1}s ({:.2} pages/s)",
                seconds,
                self.fetched as f64 / seconds
            );
        } else {
            println!("  Elapsed: {seconds:.1}s");
        }
    }
}
