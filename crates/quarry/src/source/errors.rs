use std::fmt;

use thiserror::Error;

use crate::http::HttpError;

/// Errors that prevent a source from being constructed.
///
/// These are the only errors that abort `list_repos` before any request is
/// made; everything that happens while fetching is collected instead.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A configured URL could not be parsed.
    #[error("invalid {field} URL {url:?}: {source}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A configured URL parsed but cannot serve as a base URL.
    #[error("{field} URL {url:?} cannot be used as a base URL")]
    NotABaseUrl { field: &'static str, url: String },

    /// An exclusion pattern is not a valid regular expression.
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Page size must be positive.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// The HTTP transport could not be built.
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] HttpError),
}

/// Failure of one query stream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A page request failed; the stream ended there.
    #[error("{provider}.repositoryQuery: query={query:?}, page={cursor}: {source}")]
    Page {
        provider: &'static str,
        query: String,
        /// Debug rendering of the cursor the failing request was made from.
        cursor: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The caller cancelled the fetch while the stream was running.
    #[error("{provider}.repositoryQuery: query={query:?}, page={cursor}: cancelled")]
    Cancelled {
        provider: &'static str,
        query: String,
        cursor: String,
    },

    /// A worker task panicked or was aborted.
    #[error("fetch worker failed: {0}")]
    WorkerPanicked(String),
}

impl FetchError {
    /// The query whose stream failed, when known.
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Page { query, .. } | Self::Cancelled { query, .. } => Some(query),
            Self::WorkerPanicked(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Independent failures collected during one fetch, in arrival order.
///
/// Never empty: an absent error is represented as `None` by
/// [`Listing::error`](super::Listing::error).
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<FetchError>,
}

impl AggregateError {
    /// Wrap collected errors, returning `None` when there are none.
    pub fn from_errors(errors: Vec<FetchError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[FetchError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FetchError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            write!(f, "1 error occurred:")?;
        } else {
            write!(f, "{} errors occurred:", self.errors.len())?;
        }
        for err in &self.errors {
            write!(f, "\n\t* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
