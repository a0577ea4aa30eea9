//! Repository sources.
//!
//! A source turns one configured connection into canonical [`Repo`]
//! records. The provider-independent machinery lives here:
//!
//! - [`pager`]: the contract a paginated provider client implements
//! - [`fetch`]: concurrent per-query fetching with de-duplication
//! - [`exclude`]: exclusion rules
//! - [`progress`]: progress events for callers that display them

mod bitbucketcloud;
pub mod config;
mod errors;
pub mod exclude;
pub mod fetch;
pub mod pager;
pub mod progress;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::extsvc::ExternalService;
use crate::repo::Repo;

pub use bitbucketcloud::BitbucketCloudSource;
pub use config::{ConnectionConfig, ExcludeRule, GitUrlType};
pub use errors::{AggregateError, FetchError, SourceError};
pub use exclude::ExclusionFilter;
pub use fetch::{FetchOptions, Listing, fetch_all};
pub use pager::{Page, PageCursor, ProviderRepo, RepoPager};
pub use progress::{FetchProgress, ProgressCallback, emit};

/// Something that can list the repositories of its connections.
#[async_trait]
pub trait Source: Send + Sync {
    /// List repositories, returning partial results alongside any failures.
    async fn list_repos(
        &self,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Listing<Repo>;

    /// The connections this source lists.
    fn external_services(&self) -> Vec<ExternalService>;
}
