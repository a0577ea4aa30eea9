//! Error types for Bitbucket Cloud API operations.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when interacting with the Bitbucket Cloud API.
#[derive(Debug, Error)]
pub enum BitbucketCloudError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Account or endpoint not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A next page was requested from a token that has none.
    #[error("No further pages")]
    NoMorePages,

    /// A `next` link points away from the configured API origin.
    #[error("Next page link is outside the API origin: {0}")]
    ForeignNextLink(String),
}

impl BitbucketCloudError {
    /// Classify a non-success response.
    pub(crate) fn from_status(
        status: u16,
        retry_after: Option<u64>,
        body: &[u8],
        url: &str,
    ) -> Self {
        let message = String::from_utf8_lossy(body).to_string();
        match status {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(url.to_string()),
            429 => Self::RateLimited { retry_after },
            _ => Self::Api { status, message },
        }
    }
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

/// Check if an error is a rate limit error.
pub fn is_rate_limit_error(err: &BitbucketCloudError) -> bool {
    matches!(
        err,
        BitbucketCloudError::RateLimited { .. } | BitbucketCloudError::Api { status: 429, .. }
    )
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &BitbucketCloudError) -> String {
    match err {
        BitbucketCloudError::Http(_) => "Network error".to_string(),
        BitbucketCloudError::Json(_) => "JSON parse error".to_string(),
        BitbucketCloudError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        BitbucketCloudError::RateLimited { .. } => "Rate limited".to_string(),
        BitbucketCloudError::Auth(_) => "Authentication failed".to_string(),
        BitbucketCloudError::NotFound(what) => format!("Not found: {}", what),
        BitbucketCloudError::InvalidUrl(url) => format!("Invalid URL: {}", url),
        BitbucketCloudError::NoMorePages => "No further pages".to_string(),
        BitbucketCloudError::ForeignNextLink(_) => "Next page link outside API".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        let url = "https://api.bitbucket.org/2.0/repositories";
        assert!(matches!(
            BitbucketCloudError::from_status(401, None, b"denied", url),
            BitbucketCloudError::Auth(_)
        ));
        assert!(matches!(
            BitbucketCloudError::from_status(403, None, b"denied", url),
            BitbucketCloudError::Auth(_)
        ));
        assert!(matches!(
            BitbucketCloudError::from_status(404, None, b"", url),
            BitbucketCloudError::NotFound(ref u) if u == url
        ));
        assert!(matches!(
            BitbucketCloudError::from_status(429, Some(30), b"", url),
            BitbucketCloudError::RateLimited { retry_after: Some(30) }
        ));
        assert!(matches!(
            BitbucketCloudError::from_status(502, None, b"bad gateway", url),
            BitbucketCloudError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_is_rate_limit_error() {
        assert!(is_rate_limit_error(&BitbucketCloudError::RateLimited {
            retry_after: None
        }));
        assert!(is_rate_limit_error(&BitbucketCloudError::Api {
            status: 429,
            message: "slow down".to_string(),
        }));
        assert!(!is_rate_limit_error(&BitbucketCloudError::Api {
            status: 500,
            message: "server error".to_string(),
        }));
        assert!(!is_rate_limit_error(&BitbucketCloudError::NoMorePages));
    }

    #[test]
    fn test_short_error_message_truncates_long_api_messages() {
        let err = BitbucketCloudError::Api {
            status: 500,
            message: "x".repeat(80),
        };
        let msg = short_error_message(&err);
        assert!(msg.starts_with("HTTP 500: "));
        assert!(msg.ends_with("..."));
        assert_eq!(msg.len(), "HTTP 500: ".len() + 47 + 3);
    }

    #[test]
    fn test_rate_limited_display_mentions_retry_after() {
        let err = BitbucketCloudError::RateLimited {
            retry_after: Some(12),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry after 12s");
        let err = BitbucketCloudError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }
}
