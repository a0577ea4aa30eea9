//! Quarry - repository inventory for Bitbucket Cloud connections.
//!
//! This library lists every repository a Bitbucket Cloud connection can see
//! and turns them into canonical, de-duplicated [`Repo`] records with ready
//! to use clone URLs. Failures of individual queries are collected and
//! returned next to whatever was fetched.
//!
//! # Features
//!
//! - `test-support` - Exposes [`http::MockTransport`] to downstream tests.
//!
//! # Example
//!
//! ```ignore
//! use quarry::{BitbucketCloudSource, ConnectionConfig, ExternalService, KIND_BITBUCKET_CLOUD};
//! use tokio_util::sync::CancellationToken;
//!
//! let svc = ExternalService::new(1, KIND_BITBUCKET_CLOUD, "Bitbucket");
//! let source = BitbucketCloudSource::new(svc, config, None)?;
//!
//! let listing = source.list_repos(&CancellationToken::new(), None).await;
//! if let Some(err) = &listing.error {
//!     eprintln!("partial listing: {err}");
//! }
//! ```

pub mod bitbucketcloud;
pub mod extsvc;
pub mod http;
pub mod rate_limit;
pub mod repo;
pub mod reposource;
pub mod retry;
pub mod source;

pub use extsvc::{ExternalRepoSpec, ExternalService, KIND_BITBUCKET_CLOUD};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use repo::{Repo, SourceInfo};
pub use source::{
    AggregateError, BitbucketCloudSource, ConnectionConfig, ExcludeRule, FetchError,
    FetchProgress, GitUrlType, Listing, ProgressCallback, Source, SourceError,
};
