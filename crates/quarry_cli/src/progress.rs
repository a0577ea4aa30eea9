use quarry::FetchProgress;
use quarry::ProgressCallback;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    /// Wrap this reporter in a callback the library can call.
    pub fn into_callback(self) -> ProgressCallback {
        Box::new(move |event| self.handle(event))
    }

    pub fn handle(&self, event: FetchProgress) {
        match event {
            FetchProgress::FetchingQueries { count } => {
                tracing::info!(queries = count, "Fetching repositories");
            }

            FetchProgress::FetchedPage {
                query,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(
                    query = %display_query(&query),
                    page,
                    count,
                    total_so_far,
                    "Fetched page"
                );
            }

            FetchProgress::QueryFailed { query, error } => {
                tracing::warn!(
                    query = %query.as_deref().map(display_query).unwrap_or("?"),
                    error = %error,
                    "Query failed"
                );
            }

            FetchProgress::Excluded { full_name } => {
                tracing::debug!(repo = %full_name, "Excluded");
            }

            FetchProgress::FetchComplete { total, errors } => {
                tracing::info!(total, errors, "Fetch complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn display_query(query: &str) -> &str {
    if query.is_empty() { "<member>" } else { query }
}
