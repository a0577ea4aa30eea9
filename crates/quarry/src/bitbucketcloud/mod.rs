//! Bitbucket Cloud API client.
//!
//! This module provides the paginated repository listing used by
//! [`BitbucketCloudSource`](crate::source::BitbucketCloudSource).
//!
//! # Module Structure
//!
//! - [`error`] - Error types for Bitbucket Cloud API operations
//! - [`types`] - Repository and pagination data structures
//! - [`client`] - The HTTP client and its [`RepoPager`](crate::source::RepoPager) implementation

mod client;
mod error;
mod types;

pub use client::{Client, DEFAULT_API_URL, Result};
pub use error::{BitbucketCloudError, is_rate_limit_error, short_error_message};
pub use types::{CloneLinks, Link, Links, PageToken, Repo};

/// Service type recorded in [`ExternalRepoSpec::service_type`](crate::extsvc::ExternalRepoSpec).
pub const SERVICE_TYPE: &str = "bitbucketCloud";
