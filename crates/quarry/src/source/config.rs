//! Typed connection configuration.
//!
//! The library never parses configuration text; callers deserialize a
//! [`ConnectionConfig`] from whatever format they use and hand it to the
//! source constructor, which validates it.

use serde::Deserialize;
use url::Url;

use super::errors::SourceError;
use crate::bitbucketcloud::DEFAULT_API_URL;
use crate::reposource::DEFAULT_PATH_PATTERN;

/// Default web URL of Bitbucket Cloud.
pub const DEFAULT_URL: &str = "https://bitbucket.org";

/// Default number of repositories requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// How clone URLs are built for fetched repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitUrlType {
    /// HTTPS with the app password embedded as user info.
    #[default]
    #[serde(alias = "https")]
    Http,
    /// `git@host:owner/name.git`, relying on the caller's SSH keys.
    Ssh,
}

/// A rule excluding repositories from the listing.
///
/// A repository matches when any populated field matches; a rule with no
/// populated field matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExcludeRule {
    /// Full `owner/name`, compared case-insensitively.
    pub name: Option<String>,
    /// Numeric repository id.
    pub id: Option<u64>,
    /// Repository UUID, including braces.
    pub uuid: Option<String>,
    /// Regular expression matched anywhere in the full name.
    pub pattern: Option<String>,
}

/// Configuration of one Bitbucket Cloud connection.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Web URL of the host.
    pub url: String,
    /// API base URL.
    pub api_url: String,
    pub username: String,
    pub app_password: String,
    pub git_url_type: GitUrlType,
    /// Template for repository names; see [`crate::reposource`].
    pub repository_path_pattern: String,
    pub exclude: Vec<ExcludeRule>,
    /// Workspaces listed in addition to the user's own memberships.
    pub teams: Vec<String>,
    pub page_size: u32,
    /// Proactive request pacing; unset disables it.
    pub requests_per_second: Option<u32>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            username: String::new(),
            app_password: String::new(),
            git_url_type: GitUrlType::default(),
            repository_path_pattern: DEFAULT_PATH_PATTERN.to_string(),
            exclude: Vec::new(),
            teams: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            requests_per_second: None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .field("git_url_type", &self.git_url_type)
            .field("repository_path_pattern", &self.repository_path_pattern)
            .field("exclude", &self.exclude)
            .field("teams", &self.teams)
            .field("page_size", &self.page_size)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl ConnectionConfig {
    /// Queries walked by the fetch pipeline: the user's memberships (the
    /// empty query) followed by each configured team.
    pub fn queries(&self) -> Vec<String> {
        let mut queries = vec![String::new()];
        for team in &self.teams {
            let team = team.trim();
            if !team.is_empty() && !queries.iter().any(|q| q == team) {
                queries.push(team.to_string());
            }
        }
        queries
    }
}

/// Parse a base URL and normalize it: lower-case host, path ending in `/`.
pub fn parse_base_url(field: &'static str, raw: &str) -> Result<Url, SourceError> {
    let url = Url::parse(raw.trim()).map_err(|source| SourceError::InvalidUrl {
        field,
        url: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(SourceError::NotABaseUrl {
            field,
            url: raw.to_string(),
        });
    }
    Ok(normalize_base_url(url))
}

/// Lower-case the host and make sure the path ends with `/`.
pub fn normalize_base_url(mut url: Url) -> Url {
    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            // Lower-casing a valid host yields a valid host.
            let _ = url.set_host(Some(&lower));
        }
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
