//! Repository naming from host-specific path patterns.

/// Pattern used when a connection does not configure one.
pub const DEFAULT_PATH_PATTERN: &str = "{host}/{nameWithOwner}";

/// Build the repository name for a Bitbucket Cloud repository.
///
/// `{host}` and `{nameWithOwner}` in `pattern` are substituted; an empty
/// pattern means [`DEFAULT_PATH_PATTERN`].
#[must_use]
pub fn bitbucket_cloud_repo_name(pattern: &str, host: &str, name_with_owner: &str) -> String {
    let pattern = if pattern.is_empty() {
        DEFAULT_PATH_PATTERN
    } else {
        pattern
    };

    pattern
        .replace("{host}", host)
        .replace("{nameWithOwner}", name_with_owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_uses_default() {
        assert_eq!(
            bitbucket_cloud_repo_name("", "bitbucket.org", "team/repo"),
            "bitbucket.org/team/repo"
        );
    }

    #[test]
    fn custom_pattern_substitutes_both_fields() {
        assert_eq!(
            bitbucket_cloud_repo_name("bb/{nameWithOwner}@{host}", "bitbucket.org", "team/repo"),
            "bb/team/repo@bitbucket.org"
        );
    }

    #[test]
    fn pattern_without_placeholders_is_returned_verbatim() {
        assert_eq!(
            bitbucket_cloud_repo_name("static", "bitbucket.org", "team/repo"),
            "static"
        );
    }
}
