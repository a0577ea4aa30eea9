//! Canonical, provider-agnostic repository record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::extsvc::ExternalRepoSpec;

/// Where a repository was found and how to clone it from there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    /// URN of the connection that yielded the repository.
    pub id: String,
    /// Clone URL, with credentials embedded when the connection uses HTTPS.
    pub clone_url: String,
}

/// A repository as consumed by downstream systems.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repo {
    /// Display name derived from the connection's path pattern.
    pub name: String,
    /// Canonical URI (`host/owner/name`).
    pub uri: String,
    pub description: String,
    pub external_repo: ExternalRepoSpec,
    pub fork: bool,
    pub enabled: bool,
    /// Keyed by connection URN.
    pub sources: BTreeMap<String, SourceInfo>,
    /// The provider's own representation, verbatim.
    pub metadata: serde_json::Value,
}

impl Repo {
    /// Clone URL contributed by the given connection.
    #[must_use]
    pub fn clone_url(&self, urn: &str) -> Option<&str> {
        self.sources.get(urn).map(|s| s.clone_url.as_str())
    }
}
