//! Contract between the fetch pipeline and a provider's paginated API.

use std::fmt;

use async_trait::async_trait;

/// Continuation state for paginated retrieval.
///
/// A cursor is created once per query with a fixed page size and replaced,
/// never mutated, by every successful page response.
pub trait PageCursor: Clone + fmt::Debug + Send + Sync + 'static {
    /// Cursor for the first request of a query.
    fn first(page_size: u32) -> Self;

    /// Whether another page can be requested from this cursor.
    fn has_more(&self) -> bool;
}

/// The fields of a provider repository the pipeline inspects.
pub trait ProviderRepo: Send + 'static {
    /// Stable, provider-assigned id used for de-duplication.
    fn external_id(&self) -> &str;

    /// Qualified `owner/name`.
    fn full_name(&self) -> &str;

    /// Version control system kind, e.g. `git`.
    fn scm(&self) -> &str;
}

/// One page of results plus the cursor for the next request.
#[derive(Debug, Clone)]
pub struct Page<R, C> {
    pub repos: Vec<R>,
    pub cursor: C,
}

/// A remote client that lists repositories one page at a time.
#[async_trait]
pub trait RepoPager: Send + Sync + 'static {
    type Repo: ProviderRepo;
    type Cursor: PageCursor;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short provider name used to label fetch errors.
    fn provider(&self) -> &'static str;

    /// Request the first page of `query`.
    async fn first_page(
        &self,
        query: &str,
        cursor: &Self::Cursor,
    ) -> Result<Page<Self::Repo, Self::Cursor>, Self::Error>;

    /// Request the page after `cursor`. Only called while `cursor.has_more()`.
    async fn next_page(
        &self,
        cursor: &Self::Cursor,
    ) -> Result<Page<Self::Repo, Self::Cursor>, Self::Error>;
}
