use std::fmt;

/// Lifecycle of one URL from discovery to its terminal outcome
///
/// ```text
/// Discovered -> Excluded
/// Discovered -> Queued -> Fetching -> Fetched -> Ingested
///                                             -> NestedOnly
///                               \-> Failed
/// ```
///
/// Nested-only pages end in `NestedOnly`: their links are followed but
/// the body never reaches the store. Excluded URLs are recorded without
/// ever being queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Seen in a link or seed list, not yet decided
    Discovered,

    /// Admitted by the URL rules, waiting in the frontier
    Queued,

    /// Fetch in flight
    Fetching,

    /// Body received, partition and ingest pending
    Fetched,

    /// Chunks stored (or deduplicated away); links followed
    Ingested,

    /// Listing page: links followed, body skipped
    NestedOnly,

    /// Rejected by an exclusion rule or domain tier
    Excluded,

    /// Fetch or processing failed; other pages are unaffected
    Failed,
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Discovered | Self::Queued | Self::Fetching | Self::Fetched
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ingested | Self::NestedOnly)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Excluded)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// String form stored in the pages table
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Ingested => "ingested",
            Self::NestedOnly => "nested_only",
            Self::Excluded => "excluded",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(Self::Discovered),
            "queued" => Some(Self::Queued),
            "fetching" => Some(Self::Fetching),
            "fetched" => Some(Self::Fetched),
            "ingested" => Some(Self::Ingested),
            "nested_only" => Some(Self::NestedOnly),
            "excluded" => Some(Self::Excluded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Discovered,
            Self::Queued,
            Self::Fetching,
            Self::Fetched,
            Self::Ingested,
            Self::NestedOnly,
            Self::Excluded,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
