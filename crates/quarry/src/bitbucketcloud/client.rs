//! Bitbucket Cloud API client.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{BitbucketCloudError, is_rate_limit_error, short_error_message};
use super::types::{PageToken, PagedResponse, Repo};
use crate::http::{HttpRequest, HttpTransport};
use crate::rate_limit::ApiRateLimiter;
use crate::retry::{RetryConfig, with_retry};
use crate::source::pager::{Page, PageCursor, ProviderRepo, RepoPager};

/// Default Bitbucket Cloud API URL.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org";

/// Result type for Bitbucket Cloud operations.
pub type Result<T> = std::result::Result<T, BitbucketCloudError>;

/// Bitbucket Cloud API client.
///
/// Requests are authenticated with HTTP Basic auth using the account's
/// username and an app password.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn HttpTransport>,
    api_url: Url,
    authorization: String,
    rate_limiter: Option<ApiRateLimiter>,
    retry: RetryConfig,
}

impl Client {
    /// Create a new client.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let transport = Arc::new(ReqwestTransport::with_idle_timeout(IDLE_CONNECTION_TIMEOUT)?);
    /// let api_url = Url::parse(DEFAULT_API_URL)?;
    /// let client = Client::new(api_url, "alice", "app-password", transport);
    /// let (repos, next) = client.repos("", &PageToken::new(100)).await?;
    /// ```
    pub fn new(
        api_url: Url,
        username: &str,
        app_password: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let credentials = STANDARD.encode(format!("{}:{}", username, app_password));
        Self {
            transport,
            api_url,
            authorization: format!("Basic {}", credentials),
            rate_limiter: None,
            retry: RetryConfig::default(),
        }
    }

    /// Pace every request through `limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Override how rate-limited requests are retried.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the API base URL.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// List the first page of repositories for `account`.
    ///
    /// An empty `account` lists every repository the authenticated user is a
    /// member of.
    pub async fn repos(&self, account: &str, token: &PageToken) -> Result<(Vec<Repo>, PageToken)> {
        let url = self.repos_url(account, token)?;
        let page: PagedResponse<Repo> = self.get_page(url.as_str()).await?;
        Ok((page.values, end_if_repeated(url.as_str(), page.token)))
    }

    /// Follow the `next` link of `token`.
    ///
    /// The link must share the origin of the API URL, since the request
    /// carries the account's credentials.
    pub async fn req_page(&self, token: &PageToken) -> Result<(Vec<Repo>, PageToken)> {
        let next = token
            .next
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(BitbucketCloudError::NoMorePages)?;
        let next_url =
            Url::parse(next).map_err(|_| BitbucketCloudError::InvalidUrl(next.to_string()))?;
        if next_url.origin() != self.api_url.origin() {
            return Err(BitbucketCloudError::ForeignNextLink(next.to_string()));
        }
        let page: PagedResponse<Repo> = self.get_page(next).await?;
        Ok((page.values, end_if_repeated(next, page.token)))
    }

    fn repos_url(&self, account: &str, token: &PageToken) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| BitbucketCloudError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(["2.0", "repositories"]);

        let mut params: Vec<(&str, String)> = Vec::new();
        if account.is_empty() {
            params.push(("role", "member".to_string()));
        } else {
            url.path_segments_mut()
                .map_err(|()| BitbucketCloudError::InvalidUrl(self.api_url.to_string()))?
                .push(account);
        }
        if token.pagelen != 0 {
            params.push(("pagelen", token.pagelen.to_string()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    /// GET a page, retrying while the API reports rate limiting.
    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<PagedResponse<T>> {
        with_retry(
            || self.get_page_once(url),
            is_rate_limit_error,
            short_error_message,
            url,
            &self.retry,
        )
        .await
    }

    async fn get_page_once<T: DeserializeOwned>(&self, url: &str) -> Result<PagedResponse<T>> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("Authorization", self.authorization.as_str());

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let retry_after = response
                .header("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(BitbucketCloudError::from_status(
                response.status,
                retry_after,
                &response.body,
                url,
            ));
        }

        tracing::trace!(url, bytes = response.body.len(), "Fetched page");
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Clear a `next` link that points back at the page just fetched.
fn end_if_repeated(requested: &str, mut token: PageToken) -> PageToken {
    if token.next.as_deref() == Some(requested) {
        tracing::warn!(url = requested, "Next page link repeats the current page, stopping");
        token.next = None;
    }
    token
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url.as_str())
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl PageCursor for PageToken {
    fn first(page_size: u32) -> Self {
        PageToken::new(page_size)
    }

    fn has_more(&self) -> bool {
        PageToken::has_more(self)
    }
}

impl ProviderRepo for Repo {
    fn external_id(&self) -> &str {
        &self.uuid
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn scm(&self) -> &str {
        &self.scm
    }
}

#[async_trait]
impl RepoPager for Client {
    type Repo = Repo;
    type Cursor = PageToken;
    type Error = BitbucketCloudError;

    fn provider(&self) -> &'static str {
        "bitbucketcloud"
    }

    async fn first_page(&self, query: &str, cursor: &PageToken) -> Result<Page<Repo, PageToken>> {
        let (repos, cursor) = self.repos(query, cursor).await?;
        Ok(Page { repos, cursor })
    }

    async fn next_page(&self, cursor: &PageToken) -> Result<Page<Repo, PageToken>> {
        let (repos, cursor) = self.req_page(cursor).await?;
        Ok(Page { repos, cursor })
    }
}
