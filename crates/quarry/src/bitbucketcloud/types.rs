//! Bitbucket Cloud API data types.

use serde::{Deserialize, Serialize};

/// Bitbucket Cloud repository, as returned by the `/2.0/repositories` endpoints.
///
/// Only the fields we need are declared; unknown fields are ignored.
///
/// API docs: https://developer.atlassian.com/cloud/bitbucket/rest/api-group-repositories/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    /// `workspace/slug`.
    pub full_name: String,
    /// Braced UUID, e.g. `{5c1d4d7e-...}`.
    pub uuid: String,
    /// `git`, or `hg` for legacy Mercurial repositories.
    #[serde(default)]
    pub scm: String,
    #[serde(default)]
    pub description: String,
    /// Present when the repository is a fork.
    #[serde(default)]
    pub parent: Option<Box<Repo>>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub clone: CloneLinks,
    #[serde(default)]
    pub html: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub name: String,
}

/// Clone links keyed by protocol name (`https`, `ssh`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloneLinks(pub Vec<Link>);

impl CloneLinks {
    /// The HTTPS clone link, if the API supplied one.
    #[must_use]
    pub fn https(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == "https")
            .map(|l| l.href.as_str())
    }
}

/// Pagination state returned alongside every page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    /// Total number of results, when the API reports it.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pagelen: u32,
    /// Absolute URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
}

impl PageToken {
    /// Token for a first request with the given page length.
    #[must_use]
    pub fn new(pagelen: u32) -> Self {
        Self {
            pagelen,
            ..Self::default()
        }
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// A page of results.
#[derive(Debug, Deserialize)]
pub(crate) struct PagedResponse<T> {
    #[serde(flatten)]
    pub token: PageToken,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_token_has_more_requires_non_empty_next() {
        let mut token = PageToken::new(100);
        assert!(!token.has_more());
        token.next = Some(String::new());
        assert!(!token.has_more());
        token.next = Some("https://api.bitbucket.org/2.0/repositories?page=2".to_string());
        assert!(token.has_more());
    }

    #[test]
    fn deserializes_repository_with_parent_and_links() {
        let json = serde_json::json!({
            "type": "repository",
            "uuid": "{b1}",
            "full_name": "team/fork",
            "name": "fork",
            "slug": "fork",
            "scm": "git",
            "is_private": true,
            "parent": {
                "type": "repository",
                "uuid": "{a1}",
                "full_name": "upstream/repo",
                "name": "repo"
            },
            "links": {
                "clone": [
                    {"href": "https://someone@bitbucket.org/team/fork.git", "name": "https"},
                    {"href": "git@bitbucket.org:team/fork.git", "name": "ssh"}
                ],
                "html": {"href": "https://bitbucket.org/team/fork"}
            }
        });

        let repo: Repo = serde_json::from_value(json).expect("valid repository");
        assert_eq!(repo.full_name, "team/fork");
        assert_eq!(repo.scm, "git");
        assert!(repo.is_private);
        let parent = repo.parent.as_deref().expect("parent");
        assert_eq!(parent.uuid, "{a1}");
        assert_eq!(parent.scm, "");
        assert_eq!(
            repo.links.clone.https(),
            Some("https://someone@bitbucket.org/team/fork.git")
        );
    }

    #[test]
    fn clone_links_https_is_none_without_https_entry() {
        let links = CloneLinks(vec![Link {
            href: "git@bitbucket.org:team/repo.git".to_string(),
            name: "ssh".to_string(),
        }]);
        assert_eq!(links.https(), None);
        assert_eq!(CloneLinks::default().https(), None);
    }

    #[test]
    fn paged_response_flattens_token_fields() {
        let json = serde_json::json!({
            "pagelen": 100,
            "page": 1,
            "size": 3,
            "next": "https://api.bitbucket.org/2.0/repositories?page=2",
            "values": []
        });
        let page: PagedResponse<Repo> = serde_json::from_value(json).expect("page");
        assert_eq!(page.token.pagelen, 100);
        assert_eq!(page.token.size, 3);
        assert!(page.token.has_more());
        assert!(page.values.is_empty());
    }
}
