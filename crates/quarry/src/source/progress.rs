//! Progress events for repository listing.
//!
//! Events are emitted from the task that aggregates results, never from the
//! per-query workers, so callbacks observe them in a single, total order.

/// Progress events emitted while listing repositories.
///
/// "Query" is the provider-agnostic term for what Bitbucket calls a
/// workspace or team; the empty query stands for the user's memberships.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FetchProgress {
    /// Starting to walk the given queries concurrently.
    FetchingQueries {
        /// Number of queries being walked.
        count: usize,
    },

    /// Received a page of repositories.
    FetchedPage {
        /// The query this page belongs to.
        query: String,
        /// Page number within the query (1-indexed).
        page: u32,
        /// Number of repos on this page.
        count: usize,
        /// Running total of unique repos kept so far, across all queries.
        total_so_far: usize,
    },

    /// A query stream stopped because of an error.
    QueryFailed {
        /// The query that failed, if the failure could be attributed.
        query: Option<String>,
        /// Error message.
        error: String,
    },

    /// A repository matched an exclusion rule.
    Excluded {
        /// Full `owner/name`.
        full_name: String,
    },

    /// All query streams finished.
    FetchComplete {
        /// Number of repositories kept.
        total: usize,
        /// Number of collected errors.
        errors: usize,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(FetchProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: FetchProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
