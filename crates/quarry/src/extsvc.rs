//! Identity of configured connections and of the repositories they expose.

use serde::{Deserialize, Serialize};

/// Kind string for Bitbucket Cloud connections.
pub const KIND_BITBUCKET_CLOUD: &str = "BITBUCKETCLOUD";

/// A configured connection to a code host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalService {
    /// Numeric identifier assigned by whoever owns the connection list.
    pub id: i64,
    /// Connection kind, e.g. [`KIND_BITBUCKET_CLOUD`].
    pub kind: String,
    /// Human readable name.
    pub display_name: String,
}

impl ExternalService {
    pub fn new(id: i64, kind: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            display_name: display_name.into(),
        }
    }

    /// Stable identifier of this connection, used as the key of
    /// [`Repo::sources`](crate::repo::Repo::sources).
    #[must_use]
    pub fn urn(&self) -> String {
        format!("extsvc:{}:{}", self.kind.to_lowercase(), self.id)
    }
}

/// The external identity of a repository: unique per
/// (`service_type`, `service_id`, `id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalRepoSpec {
    /// Provider-assigned repository id.
    pub id: String,
    /// Provider kind, e.g. `bitbucketCloud`.
    pub service_type: String,
    /// Normalized base URL of the host.
    pub service_id: String,
}
